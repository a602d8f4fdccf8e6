//! In-memory fakes for the pipeline's collaborators
//!
//! These let the handlers be exercised without network or AWS credentials.
//! Every fake records what it was asked to do so tests can assert on side
//! effects as well as outcomes.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use calsnap_clients::{EventPublisher, FeedClient, NotificationPublisher, VisionClient};
use calsnap_core::{EventEnvelope, FeedPost, Notification};
use calsnap_storage::{Storage, StorageError, StorageResult};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Object store backed by a map, bound to one bucket.
///
/// Presigned URLs have the form
/// `https://presigned.example.com/{bucket}/{key}?expires={secs}`.
#[derive(Clone)]
pub struct MockStorage {
    bucket: String,
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    presigned: Arc<Mutex<Vec<(String, Duration)>>>,
    exists_calls: Arc<AtomicUsize>,
    uploads: Arc<AtomicUsize>,
    exists_error: Arc<Mutex<Option<String>>>,
    presign_error: Arc<Mutex<Option<String>>>,
}

impl MockStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::new(Mutex::new(HashMap::new())),
            presigned: Arc::new(Mutex::new(Vec::new())),
            exists_calls: Arc::new(AtomicUsize::new(0)),
            uploads: Arc::new(AtomicUsize::new(0)),
            exists_error: Arc::new(Mutex::new(None)),
            presign_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Seed an object without counting it as an upload.
    pub fn insert(&self, key: &str, data: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.to_string(), data);
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Make every existence check fail with a backend error.
    pub fn fail_exists(&self, message: &str) {
        *self.exists_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_presign(&self, message: &str) {
        *self.presign_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Existence checks, uploads and presign requests combined.
    pub fn operation_count(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
            + self.upload_count()
            + self.presigned.lock().unwrap().len()
    }

    /// `(key, lifetime)` of every presigned URL handed out.
    pub fn presigned(&self) -> Vec<(String, Duration)> {
        self.presigned.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for MockStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.exists_error.lock().unwrap().clone() {
            return Err(StorageError::BackendError(message));
        }
        Ok(self.objects.lock().unwrap().contains_key(storage_key))
    }

    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .insert(storage_key.to_string(), data);
        Ok(())
    }

    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        if let Some(message) = self.presign_error.lock().unwrap().clone() {
            return Err(StorageError::BackendError(message));
        }
        if !self.objects.lock().unwrap().contains_key(storage_key) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }
        self.presigned
            .lock()
            .unwrap()
            .push((storage_key.to_string(), expires_in));
        Ok(format!(
            "https://presigned.example.com/{}/{}?expires={}",
            self.bucket,
            storage_key,
            expires_in.as_secs()
        ))
    }
}

/// Feed that always reports the same newest post.
pub struct StubFeed {
    post: Option<FeedPost>,
    image: Vec<u8>,
    error: Option<String>,
    transient_failures: AtomicUsize,
    fail_downloads: bool,
    listings: AtomicUsize,
    downloads: Mutex<Vec<String>>,
}

impl StubFeed {
    fn build(post: Option<FeedPost>, image: Vec<u8>) -> Self {
        Self {
            post,
            image,
            error: None,
            transient_failures: AtomicUsize::new(0),
            fail_downloads: false,
            listings: AtomicUsize::new(0),
            downloads: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::build(None, Vec::new())
    }

    pub fn text_only(post_id: &str) -> Self {
        Self::build(
            Some(FeedPost {
                id: post_id.to_string(),
                full_picture: None,
            }),
            Vec::new(),
        )
    }

    pub fn with_image(post_id: &str, image_url: &str, image: Vec<u8>) -> Self {
        Self::build(
            Some(FeedPost {
                id: post_id.to_string(),
                full_picture: Some(image_url.to_string()),
            }),
            image,
        )
    }

    /// Every listing request fails.
    pub fn failing(message: &str) -> Self {
        let mut feed = Self::empty();
        feed.error = Some(message.to_string());
        feed
    }

    /// The first `count` listing requests fail, later ones succeed.
    pub fn fail_first_listings(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn fail_downloads(mut self) -> Self {
        self.fail_downloads = true;
        self
    }

    /// Listing requests received, failed ones included.
    pub fn listing_count(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    pub fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }

    pub fn downloaded_urls(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedClient for StubFeed {
    async fn latest_post(&self) -> Result<Option<FeedPost>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        let transient = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if transient {
            return Err(anyhow!("Graph API request failed: 503 Service Unavailable"));
        }
        match &self.error {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(self.post.clone()),
        }
    }

    async fn download_image(&self, image_url: &str) -> Result<Vec<u8>> {
        self.downloads.lock().unwrap().push(image_url.to_string());
        if self.fail_downloads {
            return Err(anyhow!("Image download failed: 404 Not Found"));
        }
        Ok(self.image.clone())
    }
}

/// Vision service returning a canned reply.
pub struct StubVision {
    reply: std::result::Result<String, String>,
    requests: Mutex<Vec<(String, String)>>,
}

impl StubVision {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// `(instruction, image_url)` of every request received.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionClient for StubVision {
    async fn extract_text(&self, instruction: &str, image_url: &str) -> Result<String> {
        self.requests
            .lock()
            .unwrap()
            .push((instruction.to_string(), image_url.to_string()));
        self.reply.clone().map_err(|message| anyhow!("{}", message))
    }
}

/// Event bus that keeps every published envelope.
#[derive(Default)]
pub struct RecordingEventPublisher {
    published: Mutex<Vec<EventEnvelope<JsonValue>>>,
    error: Option<String>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            error: Some(message.to_string()),
        }
    }

    pub fn published(&self) -> Vec<EventEnvelope<JsonValue>> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: &EventEnvelope<JsonValue>) -> Result<()> {
        if let Some(message) = &self.error {
            return Err(anyhow!("{}", message));
        }
        self.published.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Notification channel that keeps every sent message.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    error: Option<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            error: Some(message.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationPublisher for RecordingNotifier {
    async fn publish(&self, notification: &Notification) -> Result<()> {
        if let Some(message) = &self.error {
            return Err(anyhow!("{}", message));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
