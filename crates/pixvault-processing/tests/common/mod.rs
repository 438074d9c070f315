#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use pixvault_core::{StorageBackend, StorageName};
use pixvault_storage::{Storage, StorageError, StorageResult, UrlSigner};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ACCOUNT_KEY: &str = "cGl4dmF1bHQtdGVzdC1hY2NvdW50LWtleQ==";

/// How the in-memory backend answers `put`.
#[derive(Clone, Debug)]
pub enum PutBehavior {
    Succeed,
    /// Fail transiently this many times, then succeed.
    TransientTimes(usize),
    AlwaysTransient,
    AlwaysTerminal,
    /// Sleep before answering (drives attempt timeouts).
    Slow(Duration),
    /// Sleep one millisecond per stored byte, so smaller objects finish first.
    DelayByLength,
}

/// In-memory `Storage` double that records every call.
pub struct MemoryStorage {
    behavior: PutBehavior,
    fail_delete: bool,
    objects: Mutex<HashMap<String, Bytes>>,
    completed: Mutex<Vec<String>>,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new(behavior: PutBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            fail_delete: false,
            objects: Mutex::new(HashMap::new()),
            completed: Mutex::new(Vec::new()),
            puts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        })
    }

    pub fn with_failing_delete(behavior: PutBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            fail_delete: true,
            objects: Mutex::new(HashMap::new()),
            completed: Mutex::new(Vec::new()),
            puts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        })
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn object(&self, name: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(name).cloned()
    }

    /// Names of successful writes in the order they finished.
    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, name: &StorageName, _content_type: &str, data: Bytes) -> StorageResult<()> {
        let call = self.puts.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            PutBehavior::Succeed => {}
            PutBehavior::TransientTimes(n) if call < *n => {
                return Err(StorageError::Unavailable("503 Service Unavailable".to_string()));
            }
            PutBehavior::TransientTimes(_) => {}
            PutBehavior::AlwaysTransient => {
                return Err(StorageError::Unavailable("503 Service Unavailable".to_string()));
            }
            PutBehavior::AlwaysTerminal => {
                return Err(StorageError::UploadFailed("403 Forbidden".to_string()));
            }
            PutBehavior::Slow(delay) => tokio::time::sleep(*delay).await,
            PutBehavior::DelayByLength => {
                tokio::time::sleep(Duration::from_millis(data.len() as u64)).await
            }
        }
        self.completed
            .lock()
            .unwrap()
            .push(name.as_str().to_string());
        self.objects
            .lock()
            .unwrap()
            .insert(name.as_str().to_string(), data);
        Ok(())
    }

    async fn delete(&self, name: &StorageName) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete {
            return Err(StorageError::DeleteFailed("backend gone".to_string()));
        }
        self.objects.lock().unwrap().remove(name.as_str());
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Azure
    }
}

pub fn signer() -> Arc<UrlSigner> {
    Arc::new(
        UrlSigner::new(
            "acct",
            "images",
            "https://acct.blob.core.windows.net",
            ACCOUNT_KEY,
            60,
        )
        .unwrap(),
    )
}

pub fn jpeg(len: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.resize(len.max(4), 0);
    data
}

pub fn png(len: usize) -> Vec<u8> {
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    data.resize(len.max(8), 0);
    data
}
