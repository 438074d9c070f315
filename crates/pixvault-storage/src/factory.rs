#[cfg(feature = "storage-azure")]
use crate::AzureBlobStorage;
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use pixvault_core::Config;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage.backend {
        #[cfg(feature = "storage-azure")]
        StorageBackend::Azure => {
            let signing = &config.signing;
            if signing.account_name.is_empty() {
                return Err(StorageError::ConfigError(
                    "STORAGE_ACCOUNT_NAME not configured".to_string(),
                ));
            }
            if signing.account_key.is_empty() {
                return Err(StorageError::ConfigError(
                    "STORAGE_ACCOUNT_KEY not configured".to_string(),
                ));
            }

            let default_endpoint =
                format!("https://{}.blob.core.windows.net", signing.account_name);
            let endpoint = (signing.endpoint.trim_end_matches('/') != default_endpoint)
                .then(|| signing.endpoint.clone());

            let storage = AzureBlobStorage::new(
                signing.account_name.clone(),
                signing.account_key.clone(),
                signing.container.clone(),
                endpoint,
            )?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-azure"))]
        StorageBackend::Azure => Err(StorageError::ConfigError(
            "Azure storage backend not available (storage-azure feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config
                .storage
                .local_storage_path
                .clone()
                .ok_or_else(|| {
                    StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
                })?;

            let storage = LocalStorage::new(base_path).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
