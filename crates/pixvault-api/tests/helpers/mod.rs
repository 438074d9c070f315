//! Test helpers: build AppState and router for integration tests.

#![allow(dead_code)]

pub mod fixtures;
pub mod storage;

use axum_test::TestServer;
use pixvault_api::setup::routes;
use pixvault_api::state::AppState;
use pixvault_core::Config;
use pixvault_processing::UploadService;
use pixvault_storage::UrlSigner;
use std::collections::HashMap;
use std::sync::Arc;

use storage::MemoryStorage;

pub const ACCOUNT_KEY: &str = "cGl4dmF1bHQtdGVzdC1hY2NvdW50LWtleQ==";

/// Configuration for tests; `overrides` replace the base entries.
pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("ENVIRONMENT", "test"),
        ("STORAGE_BACKEND", "azure"),
        ("STORAGE_ACCOUNT_NAME", "acct"),
        ("STORAGE_ACCOUNT_KEY", ACCOUNT_KEY),
        ("STORAGE_CONTAINER", "images"),
        ("UPLOAD_RETRY_DELAYS_MS", "0,1,1,1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }

    let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("Failed to build config");
    config.validate().expect("Invalid test config");
    config
}

/// Test application over an in-memory storage backend.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<MemoryStorage>,
    pub config: Config,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(MemoryStorage::new(), &[])
}

pub fn setup_test_app_with(storage: Arc<MemoryStorage>, overrides: &[(&str, &str)]) -> TestApp {
    let config = test_config(overrides);
    let signer = Arc::new(UrlSigner::from_config(&config.signing).expect("Failed to build signer"));

    let state = Arc::new(AppState {
        uploads: UploadService::from_config(&config, storage.clone(), signer),
        upload_policy: config.upload.clone(),
        #[cfg(feature = "storage-local")]
        local_media: None,
    });

    let app = routes::setup_routes(&config, state).expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        storage,
        config,
    }
}
