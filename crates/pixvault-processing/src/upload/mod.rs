//! Storing validated uploads.
//!
//! [`UploadService`] owns the storage handle, the URL signer and the retry schedule.
//! `upload` handles one candidate; `upload_batch` fans a list of candidates out over
//! `upload` and reports one result per input, in input order.

mod batch;
mod error;
mod pipeline;

pub use error::{BatchError, UploadError};
pub use pipeline::UploadService;
