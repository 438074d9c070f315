use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use pixvault_core::{BatchItemResult, UploadedObjectInfo};
use serde::Serialize;

use crate::auth::OwnerId;
use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::upload::{extract_files, extract_single_file};

const SINGLE_FIELD: &str = "image";
const BATCH_FIELD: &str = "images";

#[derive(Debug, Serialize)]
pub struct UploadResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> UploadResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Upload one image sent as the multipart field `image`.
///
/// Returns the storage name and a signed URL (200). Validation failures are 400
/// (413 for an oversized file); storage failures are 500.
#[tracing::instrument(
    skip(state, multipart),
    fields(owner_id = %owner.as_str(), operation = "upload_image")
)]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let candidate =
        extract_single_file(multipart, SINGLE_FIELD, state.upload_policy.max_size_bytes).await?;

    let info: UploadedObjectInfo = state
        .uploads
        .upload(&candidate, owner.as_str(), &state.upload_policy)
        .await?;

    Ok(Json(UploadResponse::ok(info)))
}

/// Upload up to `MAX_FILES_PER_BATCH` images sent as repeated `images` fields.
///
/// Per-file failures are reported inside the result list, so the call is 200 even
/// when every file fails. Only an oversized batch is refused as a whole (400), as soon
/// as the first file past the limit arrives.
#[tracing::instrument(
    skip(state, multipart),
    fields(owner_id = %owner.as_str(), operation = "upload_images")
)]
pub async fn upload_images(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let candidates = extract_files(
        multipart,
        BATCH_FIELD,
        state.upload_policy.max_size_bytes,
        state.uploads.max_files_per_batch(),
    )
    .await?;

    let results: Vec<BatchItemResult> = state
        .uploads
        .upload_batch(&candidates, owner.as_str(), &state.upload_policy)
        .await?;

    Ok(Json(UploadResponse::ok(results)))
}
