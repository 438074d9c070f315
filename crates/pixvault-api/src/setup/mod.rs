//! Application initialization

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use pixvault_core::Config;
use pixvault_processing::UploadService;
use pixvault_storage::{create_storage, UrlSigner};

use crate::state::AppState;
use crate::telemetry;

/// Build the shared state and router from a validated configuration.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router)> {
    config.validate()?;

    telemetry::init_telemetry();

    tracing::info!(
        environment = %config.server.environment,
        storage_backend = %config.storage.backend,
        container = %config.signing.container,
        "Initializing pixvault"
    );

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage backend")?;
    let signer = Arc::new(
        UrlSigner::from_config(&config.signing).context("Failed to initialize URL signer")?,
    );

    let state = Arc::new(AppState {
        uploads: UploadService::from_config(&config, storage, signer),
        upload_policy: config.upload.clone(),
        #[cfg(feature = "storage-local")]
        local_media: local_media(&config).await?,
    });

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

#[cfg(feature = "storage-local")]
async fn local_media(config: &Config) -> Result<Option<pixvault_storage::LocalStorage>> {
    if config.storage.backend != pixvault_core::StorageBackend::Local {
        return Ok(None);
    }
    let base_path = config
        .storage
        .local_storage_path
        .clone()
        .context("LOCAL_STORAGE_PATH not configured")?;
    let media = pixvault_storage::LocalStorage::new(base_path)
        .await
        .context("Failed to open local media directory")?;
    Ok(Some(media))
}
