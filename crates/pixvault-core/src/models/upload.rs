use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A file submitted for upload.
///
/// Candidates only live for the duration of a single upload call and are never persisted.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub data: Bytes,
    /// Media type as declared by the client (e.g. `image/png`).
    pub media_type: String,
    /// Original filename as supplied by the client.
    pub filename: String,
    /// Declared size in bytes.
    pub size: u64,
}

impl UploadCandidate {
    /// Build a candidate whose declared size is the payload length.
    pub fn new(
        data: impl Into<Bytes>,
        filename: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        let data = data.into();
        Self {
            size: data.len() as u64,
            data,
            media_type: media_type.into(),
            filename: filename.into(),
        }
    }

    /// Override the declared size, e.g. when the transport reported a length.
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }
}

/// Why a candidate was rejected. Every reason is final; none of them is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    FileTooLarge,
    InvalidMediaType,
    ExtensionMismatch,
    FileIntegrityError,
    EmptyBuffer,
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::FileTooLarge => "FILE_TOO_LARGE",
            RejectionReason::InvalidMediaType => "INVALID_MEDIA_TYPE",
            RejectionReason::ExtensionMismatch => "EXTENSION_MISMATCH",
            RejectionReason::FileIntegrityError => "FILE_INTEGRITY_ERROR",
            RejectionReason::EmptyBuffer => "EMPTY_BUFFER",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of validating an [`UploadCandidate`] against an upload policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    Accepted {
        /// Lowercased extension taken from the filename.
        extension: String,
        /// Declared media type, parameters stripped and lowercased.
        media_type: String,
    },
    Rejected {
        reason: RejectionReason,
        message: String,
    },
}

impl ValidationVerdict {
    pub fn rejected(reason: RejectionReason, message: impl Into<String>) -> Self {
        ValidationVerdict::Rejected {
            reason,
            message: message.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationVerdict::Accepted { .. })
    }
}

/// Name of a stored object: `{ownerId}-{millisecondTimestamp}-{uuid}.{extension}`.
///
/// This is the only value persisted by callers; URLs are always derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageName(String);

impl StorageName {
    pub fn new(name: impl Into<String>) -> Self {
        StorageName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extension after the last `.`, if any.
    pub fn extension(&self) -> Option<&str> {
        self.0
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

impl fmt::Display for StorageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of a successful single upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedObjectInfo {
    pub storage_name: StorageName,
    #[serde(rename = "signedURL")]
    pub signed_url: String,
    pub filename: String,
    pub size: u64,
    pub media_type: String,
}

/// Per-item error carried by a failed [`BatchItemResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub code: String,
    pub message: String,
}

/// One entry of a batch upload response, positionally matching its input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_name: Option<StorageName>,
    #[serde(rename = "signedURL", default, skip_serializing_if = "Option::is_none")]
    pub signed_url: Option<String>,
    pub filename: String,
    pub size: u64,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ItemError>,
}

impl BatchItemResult {
    pub fn succeeded(info: UploadedObjectInfo) -> Self {
        Self {
            success: true,
            storage_name: Some(info.storage_name),
            signed_url: Some(info.signed_url),
            filename: info.filename,
            size: info.size,
            media_type: info.media_type,
            error: None,
        }
    }

    pub fn failed(
        candidate: &UploadCandidate,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            storage_name: None,
            signed_url: None,
            filename: candidate.filename.clone(),
            size: candidate.size,
            media_type: candidate.media_type.clone(),
            error: Some(ItemError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}
