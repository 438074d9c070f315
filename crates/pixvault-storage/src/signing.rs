//! Signed read URLs for stored objects.
//!
//! URLs follow the blob service SAS layout: the query carries `sv`, `st`, `se`, `sr`,
//! `sp`, `spr` and `sig`, where `sig` is base64(HMAC-SHA256(account key, string-to-sign))
//! and the string-to-sign is the newline-joined list
//!
//! ```text
//! sp, st, se, /blob/{account}/{container}/{name}, si, sip, spr, sv, sr,
//! snapshot, ses, rscc, rscd, rsce, rscl, rsct
//! ```
//!
//! Unused fields are empty. Timestamps are RFC 3339 UTC at second precision.

use base64::Engine;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use pixvault_core::{SigningConfig, StorageName};
use sha2::Sha256;
use std::fmt;
use thiserror::Error;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Service version the string-to-sign layout corresponds to.
pub const SIGNED_VERSION: &str = "2021-08-06";
const READ_PERMISSION: &str = "r";
const BLOB_RESOURCE: &str = "b";
/// One year.
const MAX_EXPIRY_MINUTES: i64 = 60 * 24 * 365;

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Invalid account key: {0}")]
    InvalidKey(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL host {0} is not managed by this signer")]
    ForeignHost(String),

    #[error("Missing query parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid timestamp in {0}")]
    InvalidTimestamp(&'static str),

    #[error("Signature does not match")]
    SignatureMismatch,

    #[error("Signed URL is not valid before {0}")]
    NotYetValid(String),

    #[error("Signed URL expired at {0}")]
    Expired(String),
}

/// Signs and verifies read URLs for one container of one storage account.
///
/// Immutable after construction; share it behind an `Arc`.
#[derive(Clone)]
pub struct UrlSigner {
    account: String,
    container: String,
    endpoint: Url,
    /// Endpoint without a trailing slash, used as the URL prefix.
    base: String,
    protocol: &'static str,
    mac: HmacSha256,
    default_expiry_minutes: i64,
}

impl fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlSigner")
            .field("account", &self.account)
            .field("container", &self.container)
            .field("endpoint", &self.base)
            .field("default_expiry_minutes", &self.default_expiry_minutes)
            .finish_non_exhaustive()
    }
}

/// Where an input to [`UrlSigner::sign`] points.
enum Target {
    Empty,
    PassThrough,
    Managed(String),
}

struct SasParams<'a> {
    permissions: &'a str,
    start: &'a str,
    expiry: &'a str,
    protocol: &'a str,
    version: &'a str,
    resource: &'a str,
}

impl UrlSigner {
    /// Create a signer.
    ///
    /// # Arguments
    /// * `account` - storage account name, part of the canonical resource
    /// * `container` - container objects are stored in
    /// * `endpoint` - base URL objects are served from, e.g. `https://acct.blob.core.windows.net`
    /// * `account_key` - base64-encoded shared key
    /// * `default_expiry_minutes` - lifetime used by [`UrlSigner::sign_default`]
    pub fn new(
        account: impl Into<String>,
        container: impl Into<String>,
        endpoint: &str,
        account_key: &str,
        default_expiry_minutes: i64,
    ) -> Result<Self, SignatureError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| SignatureError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        let protocol = match endpoint.scheme() {
            "https" => "https",
            "http" => "https,http",
            other => {
                return Err(SignatureError::InvalidEndpoint(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        };
        if endpoint.host_str().is_none() {
            return Err(SignatureError::InvalidEndpoint(format!(
                "{} has no host",
                endpoint
            )));
        }

        let key = base64::engine::general_purpose::STANDARD
            .decode(account_key.trim())
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
        if key.is_empty() {
            return Err(SignatureError::InvalidKey("key is empty".to_string()));
        }
        let mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;

        let mut base = endpoint.as_str().trim_end_matches('/').to_string();
        if let Some(query_start) = base.find('?') {
            base.truncate(query_start);
        }

        Ok(Self {
            account: account.into(),
            container: container.into(),
            endpoint,
            base,
            protocol,
            mac,
            default_expiry_minutes,
        })
    }

    pub fn from_config(config: &SigningConfig) -> Result<Self, SignatureError> {
        Self::new(
            config.account_name.clone(),
            config.container.clone(),
            &config.endpoint,
            &config.account_key,
            config.default_expiry_minutes,
        )
    }

    pub fn default_expiry_minutes(&self) -> i64 {
        self.default_expiry_minutes
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Path of the endpoint without a trailing slash; empty when objects are served from the root.
    pub fn endpoint_path(&self) -> &str {
        self.endpoint.path().trim_end_matches('/')
    }

    /// Unsigned address of a stored object.
    pub fn object_url(&self, name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base,
            utf8_percent_encode(&self.container, PATH_SEGMENT),
            utf8_percent_encode(name, PATH_SEGMENT)
        )
    }

    /// Sign with the default lifetime.
    pub fn sign_default(&self, input: &str) -> String {
        self.sign(input, self.default_expiry_minutes)
    }

    /// Produce a signed read URL valid for `expiry_minutes` from now.
    ///
    /// `input` may be a bare storage name or a URL. Empty input yields an empty string,
    /// and URLs that do not point at the managed host come back unchanged.
    pub fn sign(&self, input: &str, expiry_minutes: i64) -> String {
        self.sign_at(input, expiry_minutes, Utc::now())
    }

    /// Deterministic variant of [`UrlSigner::sign`].
    pub fn sign_at(&self, input: &str, expiry_minutes: i64, now: DateTime<Utc>) -> String {
        match self.resolve(input) {
            Target::Empty => String::new(),
            Target::PassThrough => input.to_string(),
            Target::Managed(name) => {
                let minutes = expiry_minutes.clamp(0, MAX_EXPIRY_MINUTES);
                self.signed_url(&name, now, now + Duration::minutes(minutes))
            }
        }
    }

    /// Check a URL issued by this signer and return the object it grants access to.
    pub fn verify(&self, signed_url: &str, now: DateTime<Utc>) -> Result<StorageName, SignatureError> {
        let url = Url::parse(signed_url).map_err(|e| SignatureError::InvalidUrl(e.to_string()))?;
        if !self.is_managed(&url) {
            return Err(SignatureError::ForeignHost(
                url.host_str().unwrap_or_default().to_string(),
            ));
        }
        let name = self
            .name_from_url(&url)
            .ok_or_else(|| SignatureError::InvalidUrl(format!("no object name in {}", url.path())))?;

        let param = |key: &'static str| -> Result<String, SignatureError> {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
                .ok_or(SignatureError::MissingParameter(key))
        };
        let version = param("sv")?;
        let start = param("st")?;
        let expiry = param("se")?;
        let resource = param("sr")?;
        let permissions = param("sp")?;
        let protocol = param("spr").unwrap_or_default();
        let sig = param("sig")?;

        let provided = base64::engine::general_purpose::STANDARD
            .decode(sig.as_bytes())
            .map_err(|_| SignatureError::SignatureMismatch)?;

        let string_to_sign = self.string_to_sign(
            &name,
            &SasParams {
                permissions: &permissions,
                start: &start,
                expiry: &expiry,
                protocol: &protocol,
                version: &version,
                resource: &resource,
            },
        );
        let mut mac = self.mac.clone();
        mac.update(string_to_sign.as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| SignatureError::SignatureMismatch)?;

        let starts_at = DateTime::parse_from_rfc3339(&start)
            .map_err(|_| SignatureError::InvalidTimestamp("st"))?
            .with_timezone(&Utc);
        let expires_at = DateTime::parse_from_rfc3339(&expiry)
            .map_err(|_| SignatureError::InvalidTimestamp("se"))?
            .with_timezone(&Utc);

        if now < starts_at {
            return Err(SignatureError::NotYetValid(start));
        }
        if now >= expires_at {
            return Err(SignatureError::Expired(expiry));
        }

        Ok(StorageName::new(name))
    }

    fn resolve(&self, input: &str) -> Target {
        if input.is_empty() {
            return Target::Empty;
        }

        // Scheme-relative references inherit the scheme of the page they appear on.
        if let Some(rest) = input.strip_prefix("//") {
            return match Url::parse(&format!("https://{}", rest)) {
                Ok(url) => self.resolve_url(&url),
                Err(_) => Target::PassThrough,
            };
        }

        match Url::parse(input) {
            Ok(url) => return self.resolve_url(&url),
            Err(e) if input.contains("://") => {
                tracing::debug!(error = %e, "Leaving unparseable URL unsigned");
                return Target::PassThrough;
            }
            Err(_) => {}
        }

        let name = input.split('?').next().unwrap_or_default();
        if name.is_empty() {
            Target::Empty
        } else if name.contains('/') {
            Target::PassThrough
        } else {
            Target::Managed(name.to_string())
        }
    }

    fn resolve_url(&self, url: &Url) -> Target {
        if !self.is_managed(url) {
            return Target::PassThrough;
        }

        match self.name_from_url(url) {
            Some(name) => Target::Managed(name),
            None => {
                tracing::debug!(
                    path = %url.path(),
                    container = %self.container,
                    "Managed URL does not address the configured container"
                );
                Target::PassThrough
            }
        }
    }

    fn is_managed(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
            && url.host_str().is_some()
            && url.host_str() == self.endpoint.host_str()
            && url.port_or_known_default() == self.endpoint.port_or_known_default()
    }

    /// The path segment following the container segment.
    fn name_from_url(&self, url: &Url) -> Option<String> {
        let segments: Vec<&str> = url.path_segments()?.collect();
        let container_pos = segments.iter().position(|segment| {
            percent_decode_str(segment).decode_utf8_lossy() == self.container.as_str()
        })?;
        let raw = segments.get(container_pos + 1).filter(|s| !s.is_empty())?;
        Some(percent_decode_str(raw).decode_utf8_lossy().into_owned())
    }

    fn signed_url(&self, name: &str, start: DateTime<Utc>, expiry: DateTime<Utc>) -> String {
        let start = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let expiry = expiry.to_rfc3339_opts(SecondsFormat::Secs, true);
        let params = SasParams {
            permissions: READ_PERMISSION,
            start: &start,
            expiry: &expiry,
            protocol: self.protocol,
            version: SIGNED_VERSION,
            resource: BLOB_RESOURCE,
        };

        let mut mac = self.mac.clone();
        mac.update(self.string_to_sign(name, &params).as_bytes());
        let sig = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("sv", params.version)
            .append_pair("st", params.start)
            .append_pair("se", params.expiry)
            .append_pair("sr", params.resource)
            .append_pair("sp", params.permissions)
            .append_pair("spr", params.protocol)
            .append_pair("sig", &sig)
            .finish();

        format!("{}?{}", self.object_url(name), query)
    }

    fn string_to_sign(&self, name: &str, params: &SasParams<'_>) -> String {
        let canonical_resource = format!("/blob/{}/{}/{}", self.account, self.container, name);
        [
            params.permissions,
            params.start,
            params.expiry,
            canonical_resource.as_str(),
            "", // signed identifier
            "", // signed IP
            params.protocol,
            params.version,
            params.resource,
            "", // snapshot time
            "", // encryption scope
            "", // rscc
            "", // rscd
            "", // rsce
            "", // rscl
            "", // rsct
        ]
        .join("\n")
    }
}
