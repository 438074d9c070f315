pub mod health;
#[cfg(feature = "storage-local")]
pub mod media;
pub mod upload;
