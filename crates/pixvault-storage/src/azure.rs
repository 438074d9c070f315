use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::azure::{MicrosoftAzure, MicrosoftAzureBuilder};
use object_store::client::{HttpError, HttpErrorKind};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult, RetryConfig};
use pixvault_core::StorageName;
use std::error::Error as StdError;

/// Azure Blob Storage implementation
#[derive(Debug)]
pub struct AzureBlobStorage {
    store: MicrosoftAzure,
    account: String,
    container: String,
}

impl AzureBlobStorage {
    /// Create a new AzureBlobStorage instance
    ///
    /// # Arguments
    /// * `account` - storage account name
    /// * `access_key` - base64-encoded shared key of the account
    /// * `container` - container objects are written to
    /// * `endpoint` - optional custom endpoint (e.g. an Azurite emulator at
    ///   `http://127.0.0.1:10000/devstoreaccount1`)
    pub fn new(
        account: String,
        access_key: String,
        container: String,
        endpoint: Option<String>,
    ) -> StorageResult<Self> {
        // The upload pipeline owns the retry schedule; the client makes one attempt per call.
        let mut builder = MicrosoftAzureBuilder::new()
            .with_account(account.clone())
            .with_access_key(access_key)
            .with_container_name(container.clone())
            .with_retry(RetryConfig {
                max_retries: 0,
                ..Default::default()
            });

        if let Some(endpoint) = endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(AzureBlobStorage {
            store,
            account,
            container,
        })
    }
}

/// Map an object store failure onto the storage taxonomy.
///
/// `Generic` mixes transport failures with service rejections; only the former and
/// 408, 429 and 5xx responses are reported as transient.
fn classify(err: ObjectStoreError, name: &StorageName) -> StorageError {
    match err {
        ObjectStoreError::NotFound { .. } => StorageError::NotFound(name.to_string()),
        ObjectStoreError::InvalidPath { source } => StorageError::InvalidKey(source.to_string()),
        ObjectStoreError::Generic { store, source } => {
            let message = format!("{}: {}", store, source);
            let source: &(dyn StdError + 'static) = source.as_ref();
            if is_transient_failure(source) {
                StorageError::Unavailable(message)
            } else {
                StorageError::UploadFailed(message)
            }
        }
        ObjectStoreError::PermissionDenied { .. } | ObjectStoreError::Unauthenticated { .. } => {
            StorageError::BackendError(err.to_string())
        }
        other => StorageError::UploadFailed(other.to_string()),
    }
}

fn is_transient_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(http) = e.downcast_ref::<HttpError>() {
            return matches!(
                http.kind(),
                HttpErrorKind::Connect
                    | HttpErrorKind::Request
                    | HttpErrorKind::Timeout
                    | HttpErrorKind::Interrupted
            );
        }
        if let Some(status) = response_status(&e.to_string()) {
            return status == 408 || status == 429 || status >= 500;
        }
        current = e.source();
    }
    false
}

/// Status code of a rejected request, as rendered by the object store client.
fn response_status(message: &str) -> Option<u16> {
    let (_, rest) = message.split_once("status code: ")?;
    rest.get(..3)?.parse().ok()
}

#[async_trait]
impl Storage for AzureBlobStorage {
    async fn put(
        &self,
        name: &StorageName,
        _content_type: &str,
        data: Bytes,
    ) -> StorageResult<()> {
        let size = data.len() as u64;
        let location = Path::from(name.as_str());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(data)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                account = %self.account,
                container = %self.container,
                name = %name,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Azure blob upload failed"
            );
            classify(e, name)
        })?;

        tracing::info!(
            account = %self.account,
            container = %self.container,
            name = %name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Azure blob upload successful"
        );

        Ok(())
    }

    async fn delete(&self, name: &StorageName) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(name.as_str());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    container = %self.container,
                    name = %name,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Azure blob delete failed"
                );
                return Err(match classify(e, name) {
                    transient @ (StorageError::Unavailable(_) | StorageError::Timeout(_)) => {
                        transient
                    }
                    other => StorageError::DeleteFailed(other.to_string()),
                });
            }
        }

        tracing::info!(
            container = %self.container,
            name = %name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Azure blob delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Azure
    }
}
