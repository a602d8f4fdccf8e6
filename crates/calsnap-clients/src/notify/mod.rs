//! Notification channel publishers.

use anyhow::Result;
use async_trait::async_trait;
use calsnap_core::Notification;

#[cfg(feature = "notify-smtp")]
mod smtp;
#[cfg(feature = "notify-sns")]
mod sns;

#[cfg(feature = "notify-smtp")]
pub use smtp::SmtpPublisher;
#[cfg(feature = "notify-sns")]
pub use sns::SnsPublisher;

/// Delivers a notification to the subscriber-managed channel.
///
/// Delivery is fire-and-forget: a successful return only means the channel
/// accepted the message.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, notification: &Notification) -> Result<()>;
}
