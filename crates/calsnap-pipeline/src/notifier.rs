//! Notifier: completion event → notification channel.

use std::sync::Arc;

use calsnap_clients::NotificationPublisher;
use calsnap_core::{AppError, AppResult, Notification, OcrCompleted};

#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    /// The event carried no calorie figure; nothing was sent.
    MissingCalories,
    Published(Notification),
}

pub struct Notifier {
    publisher: Arc<dyn NotificationPublisher>,
}

impl Notifier {
    pub fn new(publisher: Arc<dyn NotificationPublisher>) -> Self {
        Self { publisher }
    }

    /// Republish one completion event. No deduplication: each call with a
    /// calorie figure sends exactly one notification.
    #[tracing::instrument(skip(self, event), fields(bucket = %event.bucket, key = %event.key))]
    pub async fn handle(&self, event: &OcrCompleted) -> AppResult<NotifyOutcome> {
        let Some(calories) = event.calories else {
            tracing::info!("Completion event has no calories, skipping notification");
            return Ok(NotifyOutcome::MissingCalories);
        };

        let notification = Notification::for_calories(calories);
        self.publisher
            .publish(&notification)
            .await
            .map_err(AppError::Notification)?;

        tracing::info!(calories = calories, "Notification published");
        Ok(NotifyOutcome::Published(notification))
    }
}
