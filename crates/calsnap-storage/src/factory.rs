#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageError, StorageResult};
use calsnap_core::Config;
use std::sync::Arc;

/// Create the storage backend described by configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let bucket = config
        .bucket_name()
        .map(String::from)
        .ok_or_else(|| StorageError::ConfigError("BUCKET_NAME not configured".to_string()))?;

    #[cfg(feature = "storage-s3")]
    {
        // Unset region falls through to the SDK default chain.
        let region = config.region().map(String::from);
        let endpoint = config.s3_endpoint().map(String::from);

        let storage = S3Storage::new(bucket, region, endpoint).await?;
        Ok(Arc::new(storage))
    }

    #[cfg(not(feature = "storage-s3"))]
    {
        Err(StorageError::ConfigError(format!(
            "no storage backend available for bucket '{}' (storage-s3 feature not enabled)",
            bucket
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calsnap_core::PipelineConfig;

    fn config(bucket: Option<&str>) -> Config {
        Config(Box::new(PipelineConfig {
            bucket_name: bucket.map(String::from),
            s3_endpoint: Some("http://localhost:9000".to_string()),
            ..PipelineConfig::default()
        }))
    }

    #[cfg(feature = "storage-s3")]
    #[tokio::test]
    async fn builds_without_explicit_region() {
        let config = config(Some("meal-photos"));
        assert_eq!(config.region(), None);

        let storage = create_storage(&config).await.unwrap();

        assert_eq!(storage.bucket(), "meal-photos");
    }

    #[tokio::test]
    async fn missing_bucket_is_a_config_error() {
        let err = create_storage(&config(None)).await.err().unwrap();

        assert!(matches!(err, StorageError::ConfigError(_)));
    }
}
