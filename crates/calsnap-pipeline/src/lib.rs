//! Calsnap Pipeline
//!
//! The three active stages of the pipeline, each a stateless handler that runs
//! one invocation to completion or fails:
//!
//! - [`ImageFetcher`]: newest feed post → object store (at most one write)
//! - [`OcrOrchestrator`]: object-created event → vision OCR → completion event
//! - [`Notifier`]: completion event → notification channel
//!
//! Stages never call each other. They are linked only through the object store
//! and the event bus, whose delivery and ordering are external concerns. Every
//! upstream failure is returned to the caller unchanged in kind; nothing here
//! retries.

pub mod fetcher;
pub mod notifier;
pub mod orchestrator;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use fetcher::{FetchOutcome, ImageFetcher};
pub use notifier::{NotifyOutcome, Notifier};
pub use orchestrator::{IgnoreReason, OcrOrchestrator, OcrOutcome};
