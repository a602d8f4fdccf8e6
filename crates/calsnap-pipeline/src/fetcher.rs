//! Image fetcher: copies the newest feed photo into the object store.

use std::sync::Arc;

use calsnap_clients::FeedClient;
use calsnap_core::constants::IMAGE_CONTENT_TYPE;
use calsnap_core::{AppError, AppResult};
use calsnap_storage::{image_key, Storage};

/// What one fetcher invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The feed returned no posts.
    NoPost,
    /// The newest post has no image.
    NoImage { post_id: String },
    /// The image was stored by an earlier invocation.
    AlreadyStored { key: String },
    /// The image was downloaded and written.
    Stored { key: String, size_bytes: usize },
}

pub struct ImageFetcher {
    feed: Arc<dyn FeedClient>,
    storage: Arc<dyn Storage>,
}

impl ImageFetcher {
    pub fn new(feed: Arc<dyn FeedClient>, storage: Arc<dyn Storage>) -> Self {
        Self { feed, storage }
    }

    /// Run one poll.
    ///
    /// Safe to repeat: a post whose key already exists is skipped without any
    /// write, so at most one object is written per post id.
    #[tracing::instrument(skip(self), fields(bucket = %self.storage.bucket()))]
    pub async fn run(&self) -> AppResult<FetchOutcome> {
        let Some(post) = self.feed.latest_post().await.map_err(AppError::Feed)? else {
            tracing::info!("No posts found in feed");
            return Ok(FetchOutcome::NoPost);
        };

        let Some(post_ref) = post.post_ref() else {
            tracing::info!(post_id = %post.id, "Latest post has no image");
            return Ok(FetchOutcome::NoImage { post_id: post.id });
        };

        let key = image_key(&post_ref.post_id)?;

        if self.storage.exists(&key).await? {
            tracing::info!(key = %key, "Image already stored, skipping");
            return Ok(FetchOutcome::AlreadyStored { key });
        }

        let data = self
            .feed
            .download_image(&post_ref.image_url)
            .await
            .map_err(AppError::Feed)?;
        let size_bytes = data.len();

        self.storage
            .upload_with_key(&key, data, IMAGE_CONTENT_TYPE)
            .await?;

        tracing::info!(
            key = %key,
            post_id = %post_ref.post_id,
            size_bytes = size_bytes,
            "Stored new feed image"
        );

        Ok(FetchOutcome::Stored { key, size_bytes })
    }
}
