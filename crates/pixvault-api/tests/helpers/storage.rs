//! In-memory storage backend for API tests.

use async_trait::async_trait;
use bytes::Bytes;
use pixvault_core::{StorageBackend, StorageName};
use pixvault_storage::{Storage, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct MemoryStorage {
    unavailable: bool,
    objects: Mutex<HashMap<String, Bytes>>,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every write fails with a transient error.
    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            unavailable: true,
            ..Self::default()
        })
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.lock().unwrap().contains_key(name)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, name: &StorageName, _content_type: &str, data: Bytes) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(StorageError::Unavailable("503 Service Unavailable".to_string()));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(name.as_str().to_string(), data);
        Ok(())
    }

    async fn delete(&self, name: &StorageName) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().unwrap().remove(name.as_str());
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Azure
    }
}
