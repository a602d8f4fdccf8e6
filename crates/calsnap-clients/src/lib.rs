//! Calsnap Clients
//!
//! One module per upstream service. Each exposes a trait that the pipeline
//! handlers depend on and, behind a feature flag, the production
//! implementation of that trait.

pub mod events;
pub mod feed;
pub mod notify;
pub mod vision;

#[cfg(feature = "bus-eventbridge")]
pub use events::EventBridgePublisher;
pub use events::EventPublisher;
pub use feed::FeedClient;
#[cfg(feature = "feed-graph")]
pub use feed::GraphFeedClient;
pub use notify::NotificationPublisher;
#[cfg(feature = "notify-smtp")]
pub use notify::SmtpPublisher;
#[cfg(feature = "notify-sns")]
pub use notify::SnsPublisher;
#[cfg(feature = "vision-openai")]
pub use vision::OpenAiVisionClient;
pub use vision::VisionClient;

/// Build an HTTP client with the shared timeout.
#[cfg(any(feature = "feed-graph", feature = "vision-openai"))]
pub(crate) fn http_client(timeout: std::time::Duration) -> anyhow::Result<reqwest::Client> {
    use anyhow::Context;

    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("calsnap/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}

/// Turn a non-success response into an error carrying status and body.
#[cfg(any(feature = "feed-graph", feature = "vision-openai"))]
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    service: &str,
) -> anyhow::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(anyhow::anyhow!(
        "{} request failed: {} - {}",
        service,
        status,
        error_text
    ))
}
