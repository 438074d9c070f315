//! Caller identity supplied by the upstream authentication layer.

use axum::{extract::FromRequestParts, http::request::Parts};
use pixvault_core::AppError;

use crate::error::HttpAppError;

pub const OWNER_ID_HEADER: &str = "x-owner-id";

/// Id of the authenticated caller, read from the `x-owner-id` header.
///
/// Extracted from request parts so it can sit in front of a `Multipart` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| OwnerId(value.to_string()))
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized(
                    "Missing owner identity".to_string(),
                ))
            })
    }
}
