//! Shared key generation for storage backends.
//!
//! Key format: `{post_id}.jpg` at the bucket root.

use calsnap_core::constants::IMAGE_KEY_EXTENSION;

use crate::traits::{StorageError, StorageResult};

/// Derive the storage key for a feed post.
///
/// The same post id always yields the same key, which is what makes the
/// fetcher's existence check an idempotency guard.
pub fn image_key(post_id: &str) -> StorageResult<String> {
    let post_id = post_id.trim();
    if post_id.is_empty() {
        return Err(StorageError::InvalidKey("post id is empty".to_string()));
    }
    if post_id.starts_with('/') || post_id.contains("..") {
        return Err(StorageError::InvalidKey(format!(
            "post id '{}' is not a safe key component",
            post_id
        )));
    }
    Ok(format!("{}.{}", post_id, IMAGE_KEY_EXTENSION))
}
