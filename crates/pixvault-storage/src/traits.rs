//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use pixvault_core::StorageName;
use std::io::ErrorKind;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Whether the operation may succeed if attempted again.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Unavailable(_) | StorageError::Timeout(_) => true,
            StorageError::IoError(e) => matches!(
                e.kind(),
                ErrorKind::TimedOut
                    | ErrorKind::Interrupted
                    | ErrorKind::WouldBlock
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// Objects are addressed by their [`StorageName`] alone; backends never see owner ids
/// or client filenames.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` under `name`, replacing any object already stored there.
    async fn put(&self, name: &StorageName, content_type: &str, data: Bytes)
        -> StorageResult<()>;

    /// Delete the object stored under `name`. Deleting a missing object succeeds.
    async fn delete(&self, name: &StorageName) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StorageError::Unavailable("503".into()).is_transient());
        assert!(StorageError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(StorageError::IoError(std::io::Error::from(ErrorKind::TimedOut)).is_transient());

        assert!(!StorageError::UploadFailed("denied".into()).is_transient());
        assert!(!StorageError::InvalidKey("../x".into()).is_transient());
        assert!(!StorageError::IoError(std::io::Error::from(ErrorKind::PermissionDenied))
            .is_transient());
    }
}
