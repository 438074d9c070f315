use pixvault_core::{AppError, RejectionReason, StorageName};
use pixvault_storage::StorageError;

/// Why a single upload failed.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The candidate failed validation; storage was never contacted.
    #[error("{message}")]
    Rejected {
        reason: RejectionReason,
        message: String,
    },

    /// Writing failed permanently or retries were exhausted.
    #[error("Failed to store {storage_name} after {attempts} attempt(s): {source}")]
    Internal {
        storage_name: StorageName,
        attempts: u32,
        #[source]
        source: StorageError,
    },
}

impl UploadError {
    /// Machine-readable code reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            UploadError::Rejected { reason, .. } => reason.code(),
            UploadError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to clients.
    pub fn client_message(&self) -> String {
        match self {
            UploadError::Rejected { message, .. } => message.clone(),
            UploadError::Internal { .. } => "Failed to store file".to_string(),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Rejected { reason, message } => AppError::Validation { reason, message },
            internal @ UploadError::Internal { .. } => AppError::Internal(internal.to_string()),
        }
    }
}

/// Why a whole batch was refused.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("Too many files: {count} provided, at most {max} allowed")]
    TooManyFiles { count: usize, max: usize },
}

impl BatchError {
    pub fn code(&self) -> &'static str {
        match self {
            BatchError::TooManyFiles { .. } => "TOO_MANY_FILES",
        }
    }
}

impl From<BatchError> for AppError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::TooManyFiles { count, max } => AppError::TooManyFiles { count, max },
        }
    }
}
