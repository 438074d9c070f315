//! Storage name allocation.
//!
//! Name format: `{ownerId}-{millisecondTimestamp}-{uuid}.{extension}`. The owner id is
//! reduced to `[A-Za-z0-9_-]` and the extension to lowercase ASCII alphanumerics, so a
//! name is always a single flat path segment.

use chrono::Utc;
use pixvault_core::StorageName;
use uuid::Uuid;

/// Allocate a fresh storage name for `owner_id` using the current time and a v4 UUID.
pub fn allocate(owner_id: &str, extension: &str) -> StorageName {
    allocate_at(
        owner_id,
        extension,
        Utc::now().timestamp_millis(),
        Uuid::new_v4(),
    )
}

/// Deterministic variant of [`allocate`].
pub fn allocate_at(owner_id: &str, extension: &str, timestamp_ms: i64, id: Uuid) -> StorageName {
    let owner: String = owner_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    let owner = if owner.is_empty() {
        "anonymous".to_string()
    } else {
        owner
    };

    let extension: String = extension
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    StorageName::new(format!("{}-{}-{}.{}", owner, timestamp_ms, id, extension))
}
