//! Serves objects written by the local backend at the URLs the signer hands out.
//!
//! Only mounted when objects live on the local filesystem; a blob service endpoint
//! serves and checks its own signed URLs.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, RawQuery, State},
    http::{header, StatusCode},
    response::Response,
};
use chrono::Utc;
use pixvault_core::{AppError, StorageName};
use pixvault_processing::media_type_for_extension;
use pixvault_storage::StorageError;

use crate::error::HttpAppError;
use crate::state::AppState;

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Return the object addressed by a signed URL.
///
/// 404 for an unknown container or object, 403 for a missing, tampered or expired
/// signature.
#[tracing::instrument(skip(state, query), fields(operation = "get_media"))]
pub async fn get_media(
    State(state): State<Arc<AppState>>,
    Path((container, name)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> Result<Response, HttpAppError> {
    let media = state
        .local_media
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Media is not served by this instance".to_string()))?;
    let signer = state.uploads.signer();
    if container != signer.container() {
        return Err(AppError::NotFound(format!("Unknown container '{}'", container)).into());
    }

    let url = format!(
        "{}?{}",
        signer.object_url(&name),
        query.unwrap_or_default()
    );
    let storage_name = signer.verify(&url, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, name = %name, "Rejected signed URL");
        AppError::Forbidden(e.to_string())
    })?;

    let data = media.read(&storage_name).await.map_err(|e| match e {
        StorageError::NotFound(_) | StorageError::InvalidKey(_) => {
            AppError::NotFound(format!("Object '{}' not found", storage_name))
        }
        other => {
            tracing::error!(error = %other, name = %storage_name, "Failed to read stored object");
            AppError::Storage(other.to_string())
        }
    })?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, media_type_of(&storage_name))
        .header(header::CACHE_CONTROL, "private, max-age=60")
        .body(Body::from(data))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })?;

    Ok(response)
}

fn media_type_of(name: &StorageName) -> &'static str {
    name.extension()
        .and_then(media_type_for_extension)
        .unwrap_or(FALLBACK_MEDIA_TYPE)
}
