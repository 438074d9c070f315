//! Multipart helpers for the upload handlers
//!
//! File parts are read chunk by chunk. Nothing past `max_size_bytes` is buffered: an
//! oversized part is drained and handed on empty with its real size, so the validator
//! reports it as too large without the server holding it in memory.

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use pixvault_core::{AppError, RejectionReason, UploadCandidate};

const UNKNOWN_FILENAME: &str = "unknown";
const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// Extract the single file sent under `field_name`.
/// Any other field is ignored; a second file under `field_name` is rejected.
pub async fn extract_single_file(
    mut multipart: Multipart,
    field_name: &str,
    max_size_bytes: u64,
) -> Result<UploadCandidate, AppError> {
    let mut candidate: Option<UploadCandidate> = None;

    while let Some(field) = next_field(&mut multipart).await? {
        if field.name() != Some(field_name) {
            continue;
        }
        if candidate.is_some() {
            return Err(AppError::InvalidInput(format!(
                "Multiple file fields are not allowed; send exactly one field named '{}'",
                field_name
            )));
        }
        candidate = Some(read_candidate(field, max_size_bytes).await?);
    }

    candidate.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))
}

/// Extract every file sent under `field_name`, in request order.
///
/// Stops at the first file past `max_files` without reading it.
pub async fn extract_files(
    mut multipart: Multipart,
    field_name: &str,
    max_size_bytes: u64,
    max_files: usize,
) -> Result<Vec<UploadCandidate>, AppError> {
    let mut candidates = Vec::new();

    while let Some(field) = next_field(&mut multipart).await? {
        if field.name() != Some(field_name) {
            continue;
        }
        if candidates.len() == max_files {
            return Err(AppError::TooManyFiles {
                count: max_files + 1,
                max: max_files,
            });
        }
        candidates.push(read_candidate(field, max_size_bytes).await?);
    }

    if candidates.is_empty() {
        return Err(AppError::InvalidInput("No files provided".to_string()));
    }

    Ok(candidates)
}

async fn next_field(multipart: &mut Multipart) -> Result<Option<Field<'_>>, AppError> {
    multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart", e))
}

async fn read_candidate(
    mut field: Field<'_>,
    max_size_bytes: u64,
) -> Result<UploadCandidate, AppError> {
    let filename = field
        .file_name()
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_FILENAME.to_string());
    let media_type = field
        .content_type()
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_MEDIA_TYPE.to_string());

    let mut data = BytesMut::new();
    let mut size: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error("Failed to read file data", e))?
    {
        size += chunk.len() as u64;
        if size <= max_size_bytes {
            data.extend_from_slice(&chunk);
        } else if !data.is_empty() {
            data = BytesMut::new();
        }
    }

    if size > max_size_bytes {
        tracing::debug!(
            filename = %filename,
            size_bytes = size,
            max_size_bytes = max_size_bytes,
            "Oversized part drained without buffering"
        );
        return Ok(
            UploadCandidate::new(Bytes::new(), filename, media_type).with_declared_size(size),
        );
    }

    Ok(UploadCandidate::new(data.freeze(), filename, media_type))
}

/// A body that hits the transport limit is reported like any other oversized upload.
fn multipart_error(context: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::validation(
            RejectionReason::FileTooLarge,
            format!("{}: {}", context, err.body_text()),
        )
    } else {
        AppError::InvalidInput(format!("{}: {}", context, err.body_text()))
    }
}
