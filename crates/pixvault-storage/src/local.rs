use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use pixvault_core::StorageName;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
///
/// Objects are stored flat under `base_path`, one file per storage name.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at `base_path`, creating the directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    /// Convert a storage name to a filesystem path.
    ///
    /// Names are single path segments; anything that could address another directory is rejected.
    fn name_to_path(&self, name: &StorageName) -> StorageResult<PathBuf> {
        let name = name.as_str();
        if name.is_empty()
            || name == "."
            || name.contains("..")
            || name.contains('/')
            || name.contains('\\')
            || name.contains('\0')
        {
            return Err(StorageError::InvalidKey(format!(
                "Storage name contains invalid characters: {:?}",
                name
            )));
        }

        Ok(self.base_path.join(name))
    }

    /// Read the object stored under `name`.
    pub async fn read(&self, name: &StorageName) -> StorageResult<Bytes> {
        let path = self.name_to_path(name)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(StorageError::IoError(e)),
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(
        &self,
        name: &StorageName,
        _content_type: &str,
        data: Bytes,
    ) -> StorageResult<()> {
        let path = self.name_to_path(name)?;
        let size = data.len();
        let start = std::time::Instant::now();

        // Write to a sibling temp file first so readers never observe a partial object.
        let tmp_path = self.base_path.join(format!("{}.partial", name));
        let write = async {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, &path).await
        };

        if let Err(e) = write.await {
            if let Err(cleanup) = fs::remove_file(&tmp_path).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        error = %cleanup,
                        path = %tmp_path.display(),
                        "Failed to remove partial file after write error"
                    );
                }
            }
            tracing::error!(
                error = %e,
                path = %path.display(),
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Local storage write failed"
            );
            return Err(StorageError::IoError(e));
        }

        tracing::info!(
            path = %path.display(),
            name = %name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(())
    }

    async fn delete(&self, name: &StorageName) -> StorageResult<()> {
        let path = self.name_to_path(name)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        tracing::info!(
            path = %path.display(),
            name = %name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_storage_put_and_delete() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let name = StorageName::new("u1-1700000000000-abc.png");

        storage
            .put(&name, "image/png", Bytes::from_static(b"png bytes"))
            .await
            .unwrap();

        let stored = std::fs::read(dir.path().join(name.as_str())).unwrap();
        assert_eq!(stored, b"png bytes");
        assert!(!dir.path().join("u1-1700000000000-abc.png.partial").exists());

        storage.delete(&name).await.unwrap();
        assert!(!dir.path().join(name.as_str()).exists());
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_object() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let name = StorageName::new("u1-1-x.jpg");

        storage.put(&name, "image/jpeg", Bytes::from_static(b"first")).await.unwrap();
        storage.put(&name, "image/jpeg", Bytes::from_static(b"second")).await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("u1-1-x.jpg")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage
            .put(&StorageName::new("../escape.png"), "image/png", Bytes::new())
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete(&StorageName::new("/etc/passwd")).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_storage_delete_nonexistent() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.delete(&StorageName::new("missing.png")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_delete_reports_failure_instead_of_skipping() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        // A directory under an object name cannot be removed with remove_file.
        std::fs::create_dir(dir.path().join("u1-1-dir.png")).unwrap();

        let result = storage.delete(&StorageName::new("u1-1-dir.png")).await;
        assert!(matches!(result, Err(StorageError::DeleteFailed(_))));
    }

    #[tokio::test]
    async fn test_read_returns_stored_bytes() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let name = StorageName::new("u1-1-r.webp");
        storage.put(&name, "image/webp", Bytes::from_static(b"webp")).await.unwrap();

        assert_eq!(storage.read(&name).await.unwrap(), Bytes::from_static(b"webp"));
        let missing = storage.read(&StorageName::new("u1-1-none.webp")).await;
        assert!(matches!(missing, Err(StorageError::NotFound(_))));
    }
}
