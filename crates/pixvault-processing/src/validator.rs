//! Upload candidate validation.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. declared size against the policy limit;
//! 2. declared media type against the allow-list;
//! 3. filename extension against the allow-list and the declared media type;
//! 4. non-empty payload;
//! 5. leading bytes against the magic signature of the declared media type.

use pixvault_core::{RejectionReason, UploadCandidate, UploadPolicy, ValidationVerdict};
use std::path::Path;

/// Magic bytes identifying one media type, plus the extensions that may carry it.
struct MediaSignature {
    media_type: &'static str,
    extensions: &'static [&'static str],
    /// `(offset, bytes)` segments that must all match.
    magic: &'static [(usize, &'static [u8])],
}

impl MediaSignature {
    fn matches(&self, data: &[u8]) -> bool {
        self.magic.iter().all(|(offset, expected)| {
            data.get(*offset..offset + expected.len()) == Some(*expected)
        })
    }
}

const SIGNATURES: &[MediaSignature] = &[
    MediaSignature {
        media_type: "image/jpeg",
        extensions: &["jpg", "jpeg"],
        magic: &[(0, &[0xFF, 0xD8, 0xFF])],
    },
    MediaSignature {
        media_type: "image/png",
        extensions: &["png"],
        magic: &[(0, &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])],
    },
    MediaSignature {
        media_type: "image/webp",
        extensions: &["webp"],
        magic: &[(0, b"RIFF"), (8, b"WEBP")],
    },
];

fn signature_for(media_type: &str) -> Option<&'static MediaSignature> {
    SIGNATURES.iter().find(|s| s.media_type == media_type)
}

/// Media type stored objects with this extension are served as.
pub fn media_type_for_extension(extension: &str) -> Option<&'static str> {
    let extension = extension.to_lowercase();
    SIGNATURES
        .iter()
        .find(|s| s.extensions.contains(&extension.as_str()))
        .map(|s| s.media_type)
}

/// Lowercase a media type and drop parameters such as `; charset=binary`.
fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_lowercase())
}

/// Validate a candidate against `policy`.
pub fn validate(candidate: &UploadCandidate, policy: &UploadPolicy) -> ValidationVerdict {
    if candidate.size > policy.max_size_bytes {
        return ValidationVerdict::rejected(
            RejectionReason::FileTooLarge,
            format!(
                "File size {} bytes exceeds maximum allowed size of {} bytes",
                candidate.size, policy.max_size_bytes
            ),
        );
    }

    let media_type = normalize_media_type(&candidate.media_type);
    if !policy.allowed_media_types.iter().any(|t| *t == media_type) {
        return ValidationVerdict::rejected(
            RejectionReason::InvalidMediaType,
            format!(
                "Invalid media type '{}'. Allowed types: {}",
                candidate.media_type,
                policy.allowed_media_types.join(", ")
            ),
        );
    }

    let Some(signature) = signature_for(&media_type) else {
        return ValidationVerdict::rejected(
            RejectionReason::InvalidMediaType,
            format!("Media type '{}' is not a supported image format", media_type),
        );
    };

    let Some(extension) = extension_of(&candidate.filename) else {
        return ValidationVerdict::rejected(
            RejectionReason::ExtensionMismatch,
            format!("File name '{}' has no extension", candidate.filename),
        );
    };

    if !policy.allowed_extensions.iter().any(|e| *e == extension) {
        return ValidationVerdict::rejected(
            RejectionReason::ExtensionMismatch,
            format!(
                "File extension '.{}' is not allowed. Allowed extensions: {}",
                extension,
                policy.allowed_extensions.join(", ")
            ),
        );
    }

    if !signature.extensions.contains(&extension.as_str()) {
        return ValidationVerdict::rejected(
            RejectionReason::ExtensionMismatch,
            format!(
                "File extension '.{}' does not match media type '{}'",
                extension, media_type
            ),
        );
    }

    if candidate.size == 0 || candidate.data.is_empty() {
        return ValidationVerdict::rejected(RejectionReason::EmptyBuffer, "File is empty");
    }

    if !signature.matches(&candidate.data) {
        return ValidationVerdict::rejected(
            RejectionReason::FileIntegrityError,
            format!(
                "File content does not match the declared type {}",
                media_type
            ),
        );
    }

    ValidationVerdict::Accepted {
        extension,
        media_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn png(len: usize) -> Vec<u8> {
        let mut data = PNG_HEADER.to_vec();
        data.resize(len.max(PNG_HEADER.len()), 0);
        data
    }

    fn jpeg(len: usize) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
        data.resize(len.max(4), 0);
        data
    }

    fn webp() -> Vec<u8> {
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&[0x24, 0, 0, 0]);
        data.extend_from_slice(b"WEBPVP8 ");
        data
    }

    fn reason(verdict: ValidationVerdict) -> RejectionReason {
        match verdict {
            ValidationVerdict::Rejected { reason, .. } => reason,
            ValidationVerdict::Accepted { .. } => panic!("expected rejection"),
        }
    }

    fn check(candidate: &UploadCandidate) -> ValidationVerdict {
        validate(candidate, &UploadPolicy::default())
    }

    #[test]
    fn test_validate_accepts_each_supported_format() {
        for candidate in [
            UploadCandidate::new(jpeg(100), "a.jpg", "image/jpeg"),
            UploadCandidate::new(jpeg(100), "a.JPEG", "image/jpeg"),
            UploadCandidate::new(png(64), "a.png", "image/png"),
            UploadCandidate::new(webp(), "a.webp", "image/webp"),
        ] {
            assert!(check(&candidate).is_accepted(), "{}", candidate.filename);
        }
    }

    #[test]
    fn test_validate_jpeg_reports_normalized_fields() {
        let candidate = UploadCandidate::new(jpeg(100), "Photo.JPG", "Image/JPEG; charset=binary");
        assert_eq!(
            validate(&candidate, &UploadPolicy::default()),
            ValidationVerdict::Accepted {
                extension: "jpg".to_string(),
                media_type: "image/jpeg".to_string(),
            }
        );
    }

    #[test]
    fn test_validate_file_too_large() {
        let candidate = UploadCandidate::new(png(6 * 1024 * 1024), "big.png", "image/png");
        let verdict = check(&candidate);
        match verdict {
            ValidationVerdict::Rejected { reason, message } => {
                assert_eq!(reason, RejectionReason::FileTooLarge);
                assert!(message.contains(&(5 * 1024 * 1024).to_string()));
            }
            other => panic!("unexpected verdict {:?}", other),
        }
    }

    #[test]
    fn test_validate_size_runs_before_media_type() {
        let candidate =
            UploadCandidate::new(vec![0u8; 10], "a.gif", "image/gif").with_declared_size(u64::MAX);
        assert_eq!(reason(check(&candidate)), RejectionReason::FileTooLarge);
    }

    #[test]
    fn test_validate_invalid_media_type() {
        let candidate = UploadCandidate::new(b"GIF89a".to_vec(), "a.gif", "image/gif");
        assert_eq!(
            reason(check(&candidate)),
            RejectionReason::InvalidMediaType
        );
    }

    #[test]
    fn test_validate_allowed_type_without_signature() {
        let mut policy = UploadPolicy::default();
        policy.allowed_media_types.push("image/gif".to_string());
        policy.allowed_extensions.push("gif".to_string());
        let candidate = UploadCandidate::new(b"GIF89a".to_vec(), "a.gif", "image/gif");
        assert_eq!(reason(validate(&candidate, &policy)), RejectionReason::InvalidMediaType);
    }

    #[test]
    fn test_validate_extension_mismatch() {

        let wrong_pair = UploadCandidate::new(png(64), "a.jpg", "image/png");
        assert_eq!(reason(check(&wrong_pair)), RejectionReason::ExtensionMismatch);

        let not_allowed = UploadCandidate::new(png(64), "a.exe", "image/png");
        assert_eq!(reason(check(&not_allowed)), RejectionReason::ExtensionMismatch);

        let no_extension = UploadCandidate::new(png(64), "noextension", "image/png");
        assert_eq!(reason(check(&no_extension)), RejectionReason::ExtensionMismatch);
    }

    #[test]
    fn test_validate_empty_buffer() {
        let candidate = UploadCandidate::new(Vec::new(), "a.png", "image/png");
        assert_eq!(reason(check(&candidate)), RejectionReason::EmptyBuffer);

        let declared_empty = UploadCandidate::new(png(64), "a.png", "image/png").with_declared_size(0);
        assert_eq!(
            reason(check(&declared_empty)),
            RejectionReason::EmptyBuffer
        );
    }

    #[test]
    fn test_validate_signature_mismatch_names_declared_type() {
        let candidate = UploadCandidate::new(png(64), "a.jpg", "image/jpeg");
        match check(&candidate) {
            ValidationVerdict::Rejected { reason, message } => {
                assert_eq!(reason, RejectionReason::FileIntegrityError);
                assert!(message.contains("image/jpeg"));
            }
            other => panic!("unexpected verdict {:?}", other),
        }
    }

    #[test]
    fn test_validate_truncated_payload() {
        let candidate = UploadCandidate::new(vec![0xFF, 0xD8], "a.jpg", "image/jpeg");
        assert_eq!(
            reason(check(&candidate)),
            RejectionReason::FileIntegrityError
        );

        let short_webp = UploadCandidate::new(b"RIFF\0\0\0\0WEB".to_vec(), "a.webp", "image/webp");
        assert_eq!(
            reason(check(&short_webp)),
            RejectionReason::FileIntegrityError
        );
    }

    #[test]
    fn test_riff_without_webp_marker_is_rejected() {
        let mut wav = b"RIFF".to_vec();
        wav.extend_from_slice(&[0x24, 0, 0, 0]);
        wav.extend_from_slice(b"WAVEfmt ");
        let candidate = UploadCandidate::new(wav, "a.webp", "image/webp");
        assert_eq!(
            reason(check(&candidate)),
            RejectionReason::FileIntegrityError
        );
    }

    #[test]
    fn test_media_type_for_extension() {
        for signature in SIGNATURES {
            for extension in signature.extensions {
                assert_eq!(media_type_for_extension(extension), Some(signature.media_type));
            }
        }
        assert_eq!(media_type_for_extension("JPG"), Some("image/jpeg"));
        assert_eq!(media_type_for_extension("gif"), None);
    }
}
