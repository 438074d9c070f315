//! Upload pipeline: validate → allocate name → write (with retries) → sign.

use bytes::Bytes;
use pixvault_core::{
    Config, RetryConfig, StorageName, UploadCandidate, UploadPolicy, UploadedObjectInfo,
    ValidationVerdict,
};
use pixvault_storage::{keys, Storage, StorageError, UrlSigner};
use std::sync::Arc;
use std::time::Instant;

use super::error::UploadError;
use crate::validator;

const MAX_FILES_PER_BATCH: usize = 10;

/// Terminal outcome of the write loop.
struct WriteFailure {
    attempts: u32,
    error: StorageError,
}

/// Stores upload candidates and hands back signed URLs for them.
#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn Storage>,
    signer: Arc<UrlSigner>,
    retry: RetryConfig,
    pub(super) max_files_per_batch: usize,
}

impl UploadService {
    pub fn new(storage: Arc<dyn Storage>, signer: Arc<UrlSigner>, retry: RetryConfig) -> Self {
        Self {
            storage,
            signer,
            retry,
            max_files_per_batch: MAX_FILES_PER_BATCH,
        }
    }

    pub fn from_config(config: &Config, storage: Arc<dyn Storage>, signer: Arc<UrlSigner>) -> Self {
        Self::new(storage, signer, config.retry.clone())
            .with_max_files_per_batch(config.max_files_per_batch)
    }

    pub fn with_max_files_per_batch(mut self, max: usize) -> Self {
        self.max_files_per_batch = max;
        self
    }

    pub fn max_files_per_batch(&self) -> usize {
        self.max_files_per_batch
    }

    pub fn signer(&self) -> &Arc<UrlSigner> {
        &self.signer
    }

    /// Validate, store and sign one candidate.
    ///
    /// Rejected candidates never reach storage. Transient write failures are retried on
    /// the configured schedule; once writing has failed for good the allocated name is
    /// deleted once, best effort, and an [`UploadError::Internal`] is returned.
    pub async fn upload(
        &self,
        candidate: &UploadCandidate,
        owner_id: &str,
        policy: &UploadPolicy,
    ) -> Result<UploadedObjectInfo, UploadError> {
        let (extension, media_type) = match validator::validate(candidate, policy) {
            ValidationVerdict::Accepted {
                extension,
                media_type,
            } => (extension, media_type),
            ValidationVerdict::Rejected { reason, message } => {
                tracing::debug!(
                    owner_id = %owner_id,
                    filename = %candidate.filename,
                    reason = %reason,
                    message = %message,
                    "Upload rejected"
                );
                return Err(UploadError::Rejected { reason, message });
            }
        };

        let storage_name = keys::allocate(owner_id, &extension);
        let start = Instant::now();

        match self
            .write_with_retry(&storage_name, &media_type, candidate.data.clone())
            .await
        {
            Ok(attempts) => {
                tracing::info!(
                    owner_id = %owner_id,
                    storage_name = %storage_name,
                    size_bytes = candidate.size,
                    attempts = attempts,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Upload stored"
                );

                let signed_url = self.signer.sign_default(storage_name.as_str());

                Ok(UploadedObjectInfo {
                    storage_name,
                    signed_url,
                    filename: candidate.filename.clone(),
                    size: candidate.size,
                    media_type,
                })
            }
            Err(WriteFailure { attempts, error }) => {
                tracing::error!(
                    error = %error,
                    owner_id = %owner_id,
                    storage_name = %storage_name,
                    attempts = attempts,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Upload failed"
                );

                self.cleanup(&storage_name).await;

                Err(UploadError::Internal {
                    storage_name,
                    attempts,
                    source: error,
                })
            }
        }
    }

    /// Write until success, a non-transient error, or the attempt budget runs out.
    /// Returns the number of attempts made.
    async fn write_with_retry(
        &self,
        name: &StorageName,
        content_type: &str,
        data: Bytes,
    ) -> Result<u32, WriteFailure> {
        let total_attempts = self.retry.total_attempts();
        let mut attempt = 0u32;

        loop {
            let delay = self.retry.delay_for_attempt(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;

            match self.write_once(name, content_type, data.clone()).await {
                Ok(()) => return Ok(attempt),
                Err(error) if error.is_transient() && attempt < total_attempts => {
                    tracing::warn!(
                        error = %error,
                        storage_name = %name,
                        attempt = attempt,
                        max_attempts = total_attempts,
                        "Transient storage failure, retrying"
                    );
                }
                Err(error) => return Err(WriteFailure { attempts: attempt, error }),
            }
        }
    }

    async fn write_once(
        &self,
        name: &StorageName,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), StorageError> {
        match self.retry.attempt_timeout() {
            Some(limit) => {
                match tokio::time::timeout(limit, self.storage.put(name, content_type, data)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(StorageError::Timeout(limit)),
                }
            }
            None => self.storage.put(name, content_type, data).await,
        }
    }

    /// Remove whatever a failed write may have left behind. Never fails.
    async fn cleanup(&self, name: &StorageName) {
        if let Err(e) = self.storage.delete(name).await {
            tracing::warn!(
                error = %e,
                storage_name = %name,
                "Failed to clean up after failed upload"
            );
        }
    }
}
