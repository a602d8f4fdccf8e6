//! OCR orchestrator: stored image → vision text → calorie figure → completion event.

use std::sync::Arc;
use std::time::{Duration, Instant};

use calsnap_clients::{EventPublisher, VisionClient};
use calsnap_core::constants::{OCR_INSTRUCTION, PRESIGNED_URL_TTL_SECS};
use calsnap_core::{AppError, AppResult, CalorieParser, OcrCompleted, OcrResult, StoredObject};
use calsnap_storage::Storage;

/// Why an object-created event was dropped before any upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Bucket name or key was empty.
    IncompleteReference,
    /// The event came from a bucket this orchestrator does not serve.
    ForeignBucket { bucket: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum OcrOutcome {
    Ignored(IgnoreReason),
    /// Text was extracted but carried no calorie figure; nothing was emitted.
    NoCalories { text: String },
    /// A completion event was published.
    Completed(OcrCompleted),
}

pub struct OcrOrchestrator {
    storage: Arc<dyn Storage>,
    vision: Arc<dyn VisionClient>,
    events: Arc<dyn EventPublisher>,
    parser: Arc<dyn CalorieParser>,
    presign_ttl: Duration,
}

impl OcrOrchestrator {
    pub fn new(
        storage: Arc<dyn Storage>,
        vision: Arc<dyn VisionClient>,
        events: Arc<dyn EventPublisher>,
        parser: Arc<dyn CalorieParser>,
    ) -> Self {
        Self {
            storage,
            vision,
            events,
            parser,
            presign_ttl: Duration::from_secs(PRESIGNED_URL_TTL_SECS),
        }
    }

    pub fn with_presign_ttl(mut self, ttl: Duration) -> Self {
        self.presign_ttl = ttl;
        self
    }

    /// Handle one object-created event.
    ///
    /// Presign, vision and publish failures are fatal. A missing calorie
    /// figure is not: the invocation ends with [`OcrOutcome::NoCalories`] and
    /// nothing is published.
    #[tracing::instrument(skip(self), fields(bucket = %object.bucket, key = %object.key))]
    pub async fn handle(&self, object: &StoredObject) -> AppResult<OcrOutcome> {
        if !object.is_complete() {
            tracing::warn!("Object reference is incomplete, ignoring event");
            return Ok(OcrOutcome::Ignored(IgnoreReason::IncompleteReference));
        }

        if object.bucket != self.storage.bucket() {
            tracing::info!(
                expected_bucket = %self.storage.bucket(),
                "Event is for another bucket, ignoring"
            );
            return Ok(OcrOutcome::Ignored(IgnoreReason::ForeignBucket {
                bucket: object.bucket.clone(),
            }));
        }

        let image_url = self
            .storage
            .get_presigned_url(&object.key, self.presign_ttl)
            .await?;

        let start = Instant::now();
        let raw_text = self
            .vision
            .extract_text(OCR_INSTRUCTION, &image_url)
            .await
            .map_err(AppError::Vision)?;

        let result = OcrResult::parse(&raw_text, self.parser.as_ref());
        tracing::info!(
            parser = self.parser.name(),
            text_len = result.text.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Text extracted"
        );

        let Some(calories) = result.calories else {
            tracing::info!("No calorie figure found in extracted text");
            return Ok(OcrOutcome::NoCalories { text: result.text });
        };

        let completed = OcrCompleted::new(object, result.text, calories);
        let envelope = completed
            .clone()
            .into_envelope()
            .to_json_detail()
            .map_err(|e| AppError::Internal(format!("Failed to encode completion event: {}", e)))?;

        self.events
            .publish(&envelope)
            .await
            .map_err(AppError::EventBus)?;

        tracing::info!(calories = calories, "Completion event published");
        Ok(OcrOutcome::Completed(completed))
    }
}
