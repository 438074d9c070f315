//! Pixvault Storage Library
//!
//! Storage abstraction for uploaded images plus the two pieces of naming and addressing
//! every backend shares:
//!
//! - [`keys`] allocates collision-resistant storage names
//!   (`{ownerId}-{millisecondTimestamp}-{uuid}.{extension}`);
//! - [`signing`] turns a storage name into a short-lived, HMAC-signed read URL and
//!   verifies such URLs.
//!
//! Names never contain a path separator, so backends store them flat.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-azure")]
pub mod azure;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod signing;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-azure")]
pub use azure::AzureBlobStorage;
pub use factory::create_storage;
pub use keys::{allocate, allocate_at};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use pixvault_core::StorageBackend;
pub use signing::{SignatureError, UrlSigner};
pub use traits::{Storage, StorageError, StorageResult};
