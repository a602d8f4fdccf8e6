//! Social feed client: newest post lookup and image download.

use anyhow::Result;
use async_trait::async_trait;
use calsnap_core::FeedPost;

/// Read access to the configured feed account.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// The most recent post, or `None` when the feed is empty.
    async fn latest_post(&self) -> Result<Option<FeedPost>>;

    /// Fetch the bytes behind a post's image URL.
    async fn download_image(&self, image_url: &str) -> Result<Vec<u8>>;
}

#[cfg(feature = "feed-graph")]
pub use graph::GraphFeedClient;

#[cfg(feature = "feed-graph")]
mod graph {
    use super::*;
    use anyhow::Context;
    use calsnap_core::FeedPage;
    use std::fmt::{Debug, Formatter, Result as FmtResult};
    use std::time::Duration;

    /// Graph API client for the `me/posts` edge.
    pub struct GraphFeedClient {
        http_client: reqwest::Client,
        base_url: String,
        version: String,
        access_token: String,
    }

    impl Debug for GraphFeedClient {
        fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
            f.debug_struct("GraphFeedClient")
                .field("base_url", &self.base_url)
                .field("version", &self.version)
                .finish()
        }
    }

    impl GraphFeedClient {
        pub fn new(
            base_url: impl Into<String>,
            version: impl Into<String>,
            access_token: impl Into<String>,
            timeout: Duration,
        ) -> Result<Self> {
            Ok(Self {
                http_client: crate::http_client(timeout)?,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                version: version.into(),
                access_token: access_token.into(),
            })
        }

        fn posts_url(&self) -> String {
            format!("{}/{}/me/posts", self.base_url, self.version)
        }
    }

    #[async_trait]
    impl FeedClient for GraphFeedClient {
        async fn latest_post(&self) -> Result<Option<FeedPost>> {
            let start = std::time::Instant::now();

            // The token travels as a query parameter; strip URLs from transport
            // errors so it never reaches the logs.
            let response = self
                .http_client
                .get(self.posts_url())
                .query(&[
                    ("fields", "id,full_picture"),
                    ("limit", "1"),
                    ("access_token", self.access_token.as_str()),
                ])
                .send()
                .await
                .map_err(|e| e.without_url())
                .context("Failed to send request to Graph API")?;

            let response = crate::ensure_success(response, "Graph API").await?;

            let page: FeedPage = response
                .json()
                .await
                .map_err(|e| e.without_url())
                .context("Failed to parse Graph API posts response")?;

            let post = page.into_latest();

            tracing::info!(
                found = post.is_some(),
                post_id = post.as_ref().map(|p| p.id.as_str()).unwrap_or(""),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Queried feed for latest post"
            );

            Ok(post)
        }

        async fn download_image(&self, image_url: &str) -> Result<Vec<u8>> {
            let start = std::time::Instant::now();

            let response = self
                .http_client
                .get(image_url)
                .send()
                .await
                .context("Failed to download feed image")?;

            let response = crate::ensure_success(response, "Image download").await?;

            let bytes = response
                .bytes()
                .await
                .context("Failed to read feed image body")?;

            tracing::info!(
                size_bytes = bytes.len(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Downloaded feed image"
            );

            Ok(bytes.to_vec())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use mockito::Matcher;

        fn client(server: &mockito::ServerGuard) -> GraphFeedClient {
            GraphFeedClient::new(server.url(), "v22.0", "test-token", Duration::from_secs(5))
                .unwrap()
        }

        fn posts_query() -> Matcher {
            Matcher::AllOf(vec![
                Matcher::UrlEncoded("fields".into(), "id,full_picture".into()),
                Matcher::UrlEncoded("limit".into(), "1".into()),
                Matcher::UrlEncoded("access_token".into(), "test-token".into()),
            ])
        }

        #[tokio::test]
        async fn latest_post_requests_single_post_with_picture() {
            let mut server = mockito::Server::new_async().await;
            let mock = server
                .mock("GET", "/v22.0/me/posts")
                .match_query(posts_query())
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(
                    r#"{"data":[{"id":"123_456","full_picture":"https://cdn.example.com/p.jpg"}]}"#,
                )
                .create_async()
                .await;

            let post = client(&server).latest_post().await.unwrap().unwrap();
            assert_eq!(post.id, "123_456");
            assert_eq!(
                post.full_picture.as_deref(),
                Some("https://cdn.example.com/p.jpg")
            );
            mock.assert_async().await;
        }

        #[tokio::test]
        async fn empty_feed_yields_none() {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/v22.0/me/posts")
                .match_query(Matcher::Any)
                .with_status(200)
                .with_body(r#"{"data":[]}"#)
                .create_async()
                .await;

            assert!(client(&server).latest_post().await.unwrap().is_none());
        }

        #[tokio::test]
        async fn api_error_is_propagated_without_token() {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/v22.0/me/posts")
                .match_query(Matcher::Any)
                .with_status(400)
                .with_body(r#"{"error":{"message":"Invalid OAuth access token.","code":190}}"#)
                .create_async()
                .await;

            let err = client(&server).latest_post().await.unwrap_err();
            let rendered = format!("{:#}", err);
            assert!(rendered.contains("400"));
            assert!(rendered.contains("Invalid OAuth access token"));
            assert!(!rendered.contains("test-token"));
        }

        #[tokio::test]
        async fn download_returns_image_bytes() {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/images/p.jpg")
                .with_status(200)
                .with_header("content-type", "image/jpeg")
                .with_body([0xFF, 0xD8, 0xFF, 0xE0])
                .create_async()
                .await;

            let url = format!("{}/images/p.jpg", server.url());
            let bytes = client(&server).download_image(&url).await.unwrap();
            assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF, 0xE0]);
        }

        #[tokio::test]
        async fn download_failure_is_an_error() {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/images/gone.jpg")
                .with_status(404)
                .create_async()
                .await;

            let url = format!("{}/images/gone.jpg", server.url());
            assert!(client(&server).download_image(&url).await.is_err());
        }
    }
}
