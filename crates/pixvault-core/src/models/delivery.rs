//! Records handed out by the read paths of collaborating services.
//!
//! Their URL-bearing fields hold a storage name (or a previously issued URL) at rest and
//! are replaced with a freshly signed URL just before the record leaves the service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An image attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostImage {
    pub id: Uuid,
    /// Storage name at rest, signed URL on delivery.
    pub url: String,
    pub display_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Public profile of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}
