//! Pixvault Core Library
//!
//! Shared domain models, the unified `AppError` type and environment-driven
//! configuration used by every pixvault crate.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

pub use config::{Config, RetryConfig, ServerConfig, SigningConfig, StorageConfig, UploadPolicy};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::*;
pub use storage_types::StorageBackend;
