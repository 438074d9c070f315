//! Delivery-time URL signing for outgoing records.

use pixvault_core::{PostImage, UserProfile};
use pixvault_storage::UrlSigner;
use std::sync::Arc;

/// A record with fields that hold a storage name at rest.
pub trait SignedFields {
    /// Replace each name-bearing field with `sign(current value)`.
    fn sign_fields(&mut self, sign: &dyn Fn(&str) -> String);
}

impl SignedFields for PostImage {
    fn sign_fields(&mut self, sign: &dyn Fn(&str) -> String) {
        self.url = sign(&self.url);
    }
}

impl SignedFields for UserProfile {
    fn sign_fields(&mut self, sign: &dyn Fn(&str) -> String) {
        if let Some(picture) = self.profile_picture.as_mut() {
            *picture = sign(picture);
        }
    }
}

/// Rewrites records just before they are returned to a client.
#[derive(Debug, Clone)]
pub struct DeliveryRewriter {
    signer: Arc<UrlSigner>,
    expiry_minutes: i64,
}

impl DeliveryRewriter {
    pub fn new(signer: Arc<UrlSigner>) -> Self {
        let expiry_minutes = signer.default_expiry_minutes();
        Self {
            signer,
            expiry_minutes,
        }
    }

    pub fn with_expiry_minutes(mut self, expiry_minutes: i64) -> Self {
        self.expiry_minutes = expiry_minutes;
        self
    }

    pub fn rewrite_list<T: SignedFields>(&self, mut records: Vec<T>) -> Vec<T> {
        for record in records.iter_mut() {
            self.rewrite(record);
        }
        records
    }

    pub fn rewrite_one<T: SignedFields>(&self, record: Option<T>) -> Option<T> {
        record.map(|mut record| {
            self.rewrite(&mut record);
            record
        })
    }

    fn rewrite<T: SignedFields>(&self, record: &mut T) {
        let sign = |value: &str| self.signer.sign(value, self.expiry_minutes);
        record.sign_fields(&sign);
    }
}
