//! Error types module
//!
//! Every pipeline stage reports failures through [`AppError`]. Expected absence
//! (no post, no calorie figure) is never an error; handlers report it through
//! their outcome types instead. Anything that does reach `AppError` is fatal for
//! the current invocation and is surfaced to whatever invoked the handler.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors like malformed input events
    Debug,
    /// Misconfiguration the operator can fix
    Warn,
    /// Upstream failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Feed error: {0:#}")]
    Feed(#[source] anyhow::Error),

    #[error("Vision service error: {0:#}")]
    Vision(#[source] anyhow::Error),

    #[error("Event bus error: {0:#}")]
    EventBus(#[source] anyhow::Error),

    #[error("Notification error: {0:#}")]
    Notification(#[source] anyhow::Error),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Feed(_) => "FEED_ERROR",
            AppError::Vision(_) => "VISION_ERROR",
            AppError::EventBus(_) => "EVENT_BUS_ERROR",
            AppError::Notification(_) => "NOTIFICATION_ERROR",
            AppError::InvalidEvent(_) => "INVALID_EVENT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether re-invoking the handler with the same input may succeed.
    ///
    /// Nothing in calsnap retries on its own; this only informs the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Storage(_)
                | AppError::Feed(_)
                | AppError::Vision(_)
                | AppError::EventBus(_)
                | AppError::Notification(_)
        )
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            AppError::InvalidEvent(_) => LogLevel::Debug,
            AppError::Config(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidEvent(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_are_recoverable() {
        let err = AppError::Vision(anyhow::anyhow!("503 Service Unavailable"));
        assert!(err.is_recoverable());
        assert_eq!(err.error_code(), "VISION_ERROR");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn malformed_events_are_not_recoverable() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(!err.is_recoverable());
        assert_eq!(err.error_code(), "INVALID_EVENT");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn display_includes_source_chain() {
        let source = anyhow::anyhow!("connection refused").context("Failed to query feed");
        let err = AppError::Feed(source);
        let rendered = err.to_string();
        assert!(rendered.contains("Failed to query feed"));
        assert!(rendered.contains("connection refused"));
    }
}
