//! Pixvault Processing Library
//!
//! The write and read paths for user images:
//!
//! - [`validator`] checks declared metadata and leading magic bytes of a candidate;
//! - [`upload`] stores accepted candidates with bounded retries and cleanup, one at a
//!   time or as an order-preserving batch;
//! - [`delivery`] swaps stored names inside outgoing records for fresh signed URLs.

pub mod delivery;
pub mod upload;
pub mod validator;

pub use delivery::{DeliveryRewriter, SignedFields};
pub use upload::{BatchError, UploadError, UploadService};
pub use validator::{media_type_for_extension, validate};
