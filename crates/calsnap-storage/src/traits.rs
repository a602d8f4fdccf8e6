//! Storage abstraction trait
//!
//! This module defines the Storage trait that object-store backends implement.

use async_trait::async_trait;
use calsnap_core::AppError;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConfigError(msg) => AppError::Config(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// A backend is bound to one bucket for its whole lifetime; keys are relative
/// to that bucket.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Name of the bucket this backend reads and writes.
    fn bucket(&self) -> &str;

    /// Check if an object exists.
    ///
    /// Only a definite "not found" maps to `Ok(false)`; any other failure of the
    /// existence check is an error.
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Upload data under a specific key, replacing any existing object.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Generate a presigned GET URL granting temporary read access to one object.
    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;
}
