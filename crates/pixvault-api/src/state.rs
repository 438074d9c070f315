use pixvault_core::UploadPolicy;
use pixvault_processing::UploadService;
#[cfg(feature = "storage-local")]
use pixvault_storage::LocalStorage;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub uploads: UploadService,
    pub upload_policy: UploadPolicy,
    /// Set when objects are written to the local filesystem and served by this process.
    #[cfg(feature = "storage-local")]
    pub local_media: Option<LocalStorage>,
}
