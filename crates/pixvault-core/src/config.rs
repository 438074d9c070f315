//! Configuration module
//!
//! Everything is read from the environment (a `.env` file is honoured through
//! `dotenvy`). [`Config::from_lookup`] takes any key lookup so tests can build a
//! configuration without touching the process environment.

use std::env;
use std::time::Duration;

use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 4000;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;
const MAX_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const ALLOWED_MEDIA_TYPES: &str = "image/jpeg,image/png,image/webp";
const ALLOWED_EXTENSIONS: &str = "jpg,jpeg,png,webp";
const UPLOAD_MAX_RETRIES: u32 = 3;
const UPLOAD_RETRY_DELAYS_MS: &str = "0,100,200,400";
const MAX_FILES_PER_BATCH: usize = 10;
const SIGNED_URL_EXPIRY_MINUTES: i64 = 60;
const STORAGE_CONTAINER: &str = "images";

/// Limits an upload candidate must satisfy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_size_bytes: u64,
    /// Lowercased media types without parameters.
    pub allowed_media_types: Vec<String>,
    /// Lowercased extensions without the leading dot.
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: MAX_FILE_SIZE_BYTES,
            allowed_media_types: split_list(ALLOWED_MEDIA_TYPES),
            allowed_extensions: split_list(ALLOWED_EXTENSIONS),
        }
    }
}

/// Retry schedule for storage writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// Delay before attempt `n` (0-based). Attempts past the end reuse the last entry.
    pub delays_ms: Vec<u64>,
    /// Optional bound on a single write attempt.
    pub attempt_timeout_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: UPLOAD_MAX_RETRIES,
            delays_ms: vec![0, 100, 200, 400],
            attempt_timeout_ms: None,
        }
    }
}

impl RetryConfig {
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let ms = self
            .delays_ms
            .get(attempt as usize)
            .or_else(|| self.delays_ms.last())
            .copied()
            .unwrap_or(0);
        Duration::from_millis(ms)
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_ms.map(Duration::from_millis)
    }
}

/// Credentials and addressing used to sign delivery URLs.
#[derive(Clone, Debug)]
pub struct SigningConfig {
    pub account_name: String,
    /// Base64-encoded shared account key.
    pub account_key: String,
    pub container: String,
    /// Base URL objects are served from, e.g. `https://acct.blob.core.windows.net`.
    pub endpoint: String,
    pub default_expiry_minutes: i64,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_storage_path: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    /// Server-wide cap on in-flight requests.
    pub http_concurrency_limit: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadPolicy,
    pub retry: RetryConfig,
    pub max_files_per_batch: usize,
    pub storage: StorageConfig,
    pub signing: SigningConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let cors_origins_str = lookup("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        if is_production_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let server = ServerConfig {
            port: parse_or(&lookup, "PORT", SERVER_PORT)?,
            environment,
            cors_origins: cors_origins_str
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            http_concurrency_limit: parse_or(&lookup, "HTTP_CONCURRENCY_LIMIT", HTTP_CONCURRENCY_LIMIT)?
                .max(1),
        };

        let upload = UploadPolicy {
            max_size_bytes: parse_or(&lookup, "MAX_FILE_SIZE_BYTES", MAX_FILE_SIZE_BYTES)?,
            allowed_media_types: split_list(
                &lookup("ALLOWED_MEDIA_TYPES").unwrap_or_else(|| ALLOWED_MEDIA_TYPES.to_string()),
            ),
            allowed_extensions: split_list(
                &lookup("ALLOWED_EXTENSIONS").unwrap_or_else(|| ALLOWED_EXTENSIONS.to_string()),
            ),
        };

        let delays_str =
            lookup("UPLOAD_RETRY_DELAYS_MS").unwrap_or_else(|| UPLOAD_RETRY_DELAYS_MS.to_string());
        let delays_ms = delays_str
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u64>().map_err(|e| {
                    anyhow::anyhow!("UPLOAD_RETRY_DELAYS_MS entry '{}' is invalid: {}", s, e)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let retry = RetryConfig {
            max_retries: parse_or(&lookup, "UPLOAD_MAX_RETRIES", UPLOAD_MAX_RETRIES)?,
            delays_ms,
            attempt_timeout_ms: parse_opt(&lookup, "UPLOAD_ATTEMPT_TIMEOUT_MS")?,
        };

        let backend = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::Azure,
        };

        let storage = StorageConfig {
            backend,
            local_storage_path: lookup("LOCAL_STORAGE_PATH"),
        };

        let account_name = lookup("STORAGE_ACCOUNT_NAME").unwrap_or_else(|| match backend {
            StorageBackend::Azure => String::new(),
            StorageBackend::Local => "local".to_string(),
        });
        let endpoint = lookup("STORAGE_ENDPOINT").unwrap_or_else(|| match backend {
            StorageBackend::Azure => format!("https://{}.blob.core.windows.net", account_name),
            StorageBackend::Local => format!("http://localhost:{}/media", server.port),
        });

        let signing = SigningConfig {
            account_name,
            account_key: lookup("STORAGE_ACCOUNT_KEY").unwrap_or_default(),
            container: lookup("STORAGE_CONTAINER").unwrap_or_else(|| STORAGE_CONTAINER.to_string()),
            endpoint,
            default_expiry_minutes: parse_or(
                &lookup,
                "SIGNED_URL_EXPIRY_MINUTES",
                SIGNED_URL_EXPIRY_MINUTES,
            )?,
        };

        Ok(Config {
            server,
            upload,
            retry,
            max_files_per_batch: parse_or(&lookup, "MAX_FILES_PER_BATCH", MAX_FILES_PER_BATCH)?,
            storage,
            signing,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.upload.max_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_BYTES must be greater than 0"));
        }

        if self.upload.allowed_media_types.is_empty() || self.upload.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_MEDIA_TYPES and ALLOWED_EXTENSIONS must not be empty"
            ));
        }

        if self.retry.delays_ms.is_empty() {
            return Err(anyhow::anyhow!(
                "UPLOAD_RETRY_DELAYS_MS must contain at least one delay"
            ));
        }

        if self.retry.attempt_timeout_ms == Some(0) {
            return Err(anyhow::anyhow!("UPLOAD_ATTEMPT_TIMEOUT_MS must be greater than 0"));
        }

        if self.max_files_per_batch == 0 {
            return Err(anyhow::anyhow!("MAX_FILES_PER_BATCH must be greater than 0"));
        }

        if self.signing.default_expiry_minutes <= 0 {
            return Err(anyhow::anyhow!(
                "SIGNED_URL_EXPIRY_MINUTES must be greater than 0"
            ));
        }

        if self.signing.account_key.is_empty() {
            return Err(anyhow::anyhow!("STORAGE_ACCOUNT_KEY must be set"));
        }

        if self.signing.container.is_empty() {
            return Err(anyhow::anyhow!("STORAGE_CONTAINER must not be empty"));
        }

        match self.storage.backend {
            StorageBackend::Azure => {
                if self.signing.account_name.is_empty() {
                    return Err(anyhow::anyhow!(
                        "STORAGE_ACCOUNT_NAME must be set when using Azure storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.server.environment)
    }

    /// Largest request body the upload routes accept.
    ///
    /// Parts over `max_size_bytes` are drained rather than buffered, so the transport cap
    /// sits at twice a full batch to leave room for oversized parts to be reported per item.
    pub fn max_request_body_bytes(&self) -> usize {
        const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;
        let batch = self
            .upload
            .max_size_bytes
            .saturating_mul(self.max_files_per_batch as u64)
            .saturating_mul(2);
        usize::try_from(batch.saturating_add(MULTIPART_OVERHEAD_BYTES)).unwrap_or(usize::MAX)
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}

fn parse_opt<F, T>(lookup: &F, key: &str) -> Result<Option<T>, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("{} '{}' is invalid: {}", key, value, e))
        })
        .transpose()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORAGE_ACCOUNT_NAME", "acct"),
            ("STORAGE_ACCOUNT_KEY", "c2VjcmV0"),
        ]))
        .unwrap();

        assert_eq!(config.upload.max_size_bytes, 5 * 1024 * 1024);
        assert_eq!(
            config.upload.allowed_media_types,
            vec!["image/jpeg", "image/png", "image/webp"]
        );
        assert_eq!(config.upload.allowed_extensions, vec!["jpg", "jpeg", "png", "webp"]);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.delays_ms, vec![0, 100, 200, 400]);
        assert_eq!(config.retry.attempt_timeout_ms, None);
        assert_eq!(config.max_files_per_batch, 10);
        assert_eq!(config.signing.default_expiry_minutes, 60);
        assert_eq!(config.signing.container, "images");
        assert_eq!(config.signing.endpoint, "https://acct.blob.core.windows.net");
        assert_eq!(config.storage.backend, StorageBackend::Azure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_are_normalized() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", "/tmp/pixvault"),
            ("STORAGE_ACCOUNT_KEY", "c2VjcmV0"),
            ("ALLOWED_EXTENSIONS", " .PNG, Jpg "),
            ("UPLOAD_RETRY_DELAYS_MS", "5, 10"),
            ("UPLOAD_ATTEMPT_TIMEOUT_MS", "2500"),
            ("PORT", "8080"),
        ]))
        .unwrap();

        assert_eq!(config.upload.allowed_extensions, vec!["png", "jpg"]);
        assert_eq!(config.retry.delays_ms, vec![5, 10]);
        assert_eq!(config.retry.attempt_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.signing.account_name, "local");
        assert_eq!(config.signing.endpoint, "http://localhost:8080/media");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_retry_delay_is_an_error() {
        let result = Config::from_lookup(lookup_from(&[("UPLOAD_RETRY_DELAYS_MS", "0,soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_numbers_are_errors() {
        for (key, value) in [
            ("MAX_FILE_SIZE_BYTES", "5MB"),
            ("UPLOAD_ATTEMPT_TIMEOUT_MS", "abc"),
            ("MAX_FILES_PER_BATCH", "-1"),
            ("SIGNED_URL_EXPIRY_MINUTES", "an hour"),
        ] {
            let err = Config::from_lookup(lookup_from(&[(key, value)])).unwrap_err();
            assert!(err.to_string().contains(key), "{}", err);
        }
    }

    #[test]
    fn test_request_body_limit_leaves_room_for_oversized_parts() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(
            config.max_request_body_bytes(),
            2 * 10 * 5 * 1024 * 1024 + 1024 * 1024
        );
    }

    #[test]
    fn test_attempt_timeout_is_parsed() {
        let config =
            Config::from_lookup(lookup_from(&[("UPLOAD_ATTEMPT_TIMEOUT_MS", " 2500 ")])).unwrap();
        assert_eq!(config.retry.attempt_timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_validate_requires_backend_settings() {
        let azure = Config::from_lookup(lookup_from(&[("STORAGE_ACCOUNT_KEY", "c2VjcmV0")])).unwrap();
        assert!(azure.validate().is_err());

        let local = Config::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "local"),
            ("STORAGE_ACCOUNT_KEY", "c2VjcmV0"),
        ]))
        .unwrap();
        assert!(local.validate().is_err());
    }

    #[test]
    fn test_production_rejects_wildcard_cors() {
        let result = Config::from_lookup(lookup_from(&[("ENVIRONMENT", "production")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_delay_for_attempt_clamps_to_last_entry() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(retry.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(retry.delay_for_attempt(9), Duration::from_millis(400));
        assert_eq!(retry.total_attempts(), 4);
    }
}
