//! Calsnap Storage Library
//!
//! This crate provides the object-store abstraction used by the fetcher and
//! the OCR orchestrator, plus its S3 implementation.
//!
//! # Storage key format
//!
//! One object per feed post, keyed `{post_id}.jpg` at the bucket root. Keys must
//! not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::image_key;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
