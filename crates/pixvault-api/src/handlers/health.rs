use axum::{response::IntoResponse, Json};
use serde_json::json;

#[tracing::instrument]
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
