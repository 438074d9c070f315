pub mod delivery;
pub mod upload;

pub use delivery::{PostImage, UserProfile};
pub use upload::{
    BatchItemResult, ItemError, RejectionReason, StorageName, UploadCandidate, UploadedObjectInfo,
    ValidationVerdict,
};
