//! Domain models
//!
//! Every entity here is a transient message: produced once by one stage and
//! consumed at most once downstream. Nothing is mutated after creation.

pub mod events;
pub mod feed;
pub mod notification;
pub mod ocr;

pub use events::{EventEnvelope, ObjectCreatedDetail, OcrCompleted, PipelineEvent, StoredObject};
pub use feed::{FeedPage, FeedPost, PostRef};
pub use notification::Notification;
pub use ocr::OcrResult;
