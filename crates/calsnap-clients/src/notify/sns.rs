use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::Client;
use calsnap_core::Notification;

use super::NotificationPublisher;

/// SNS subjects are limited to 100 characters.
const MAX_SUBJECT_CHARS: usize = 100;

/// Publishes to a pre-provisioned SNS topic whose subscribers (a confirmed
/// e-mail address, typically) receive the message.
#[derive(Clone)]
pub struct SnsPublisher {
    client: Client,
    topic_arn: String,
}

impl SnsPublisher {
    pub async fn new(topic_arn: impl Into<String>, region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let config = loader.load().await;
        Self::from_client(Client::new(&config), topic_arn)
    }

    pub fn from_client(client: Client, topic_arn: impl Into<String>) -> Self {
        Self {
            client,
            topic_arn: topic_arn.into(),
        }
    }
}

fn truncate_subject(subject: &str) -> String {
    subject.chars().take(MAX_SUBJECT_CHARS).collect()
}

#[async_trait]
impl NotificationPublisher for SnsPublisher {
    async fn publish(&self, notification: &Notification) -> Result<()> {
        let start = std::time::Instant::now();

        let output = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(truncate_subject(&notification.subject))
            .message(&notification.message)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(&e)))
            .context("Failed to publish notification to SNS")?;

        tracing::info!(
            topic_arn = %self.topic_arn,
            message_id = output.message_id().unwrap_or_default(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "SNS publish completed"
        );

        Ok(())
    }
}
