//! Filename sanitization and upload pre-flight checks.
//!
//! The sanitizer produces a safe storage path segment from a user-supplied
//! filename. Its output is only ever used to build blob paths; logical
//! attachment identity is always the *original* filename.

use crate::defaults::{FILENAME_MAX_BYTES, PLACEHOLDER_FILENAME};
use crate::error::{Error, Result};

/// Characters replaced by `_`: path separators and shell hazards.
const HAZARD_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Sanitize a filename for use as a storage path segment.
///
/// Rules, applied in order:
/// 1. empty input returns [`PLACEHOLDER_FILENAME`];
/// 2. every path-separator or shell-hazard character becomes `_`;
/// 3. every `..` substring collapses to `_`;
/// 4. leading `.` characters are stripped;
/// 5. the result is truncated to [`FILENAME_MAX_BYTES`] characters.
///
/// Deterministic, side-effect-free, and idempotent; never fails. Inputs
/// that reduce to nothing (e.g. `"."`) also yield the placeholder.
pub fn sanitize_filename(filename: &str) -> String {
    if filename.is_empty() {
        return PLACEHOLDER_FILENAME.to_string();
    }

    let replaced: String = filename
        .chars()
        .map(|c| if HAZARD_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let collapsed = replaced.replace("..", "_");
    let stripped = collapsed.trim_start_matches('.');

    if stripped.is_empty() {
        return PLACEHOLDER_FILENAME.to_string();
    }

    stripped.chars().take(FILENAME_MAX_BYTES).collect()
}

/// Reject an upload whose payload exceeds `max_bytes`.
///
/// Runs before any store I/O; oversized files surface as a per-file
/// validation failure and never reach the blob store.
pub fn validate_upload(filename: &str, size_bytes: u64, max_bytes: u64) -> Result<()> {
    if size_bytes > max_bytes {
        return Err(Error::InvalidInput(format!(
            "{} exceeds maximum upload size of {} bytes",
            filename, max_bytes
        )));
    }
    Ok(())
}

/// Detect the actual content type of an upload.
///
/// Magic bytes win over everything; text formats without magic bytes fall
/// back to the extension; a binary claim that the bytes cannot corroborate
/// is downgraded to `application/octet-stream` rather than trusted.
pub fn detect_content_type(filename: &str, data: &[u8], claimed: &str) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }

    if let Some(ext) = filename.rsplit('.').next() {
        if let Some(mime) = mime_from_extension(ext) {
            return mime.to_string();
        }
    }

    if claimed.is_empty() || claimed_is_binary(claimed) {
        return "application/octet-stream".to_string();
    }

    claimed.to_string()
}

/// Text-only extension map: formats that genuinely lack magic bytes.
/// Binary media is intentionally absent; it must pass magic-byte detection.
fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        "txt" | "log" => Some("text/plain"),
        "md" | "markdown" => Some("text/markdown"),
        "csv" => Some("text/csv"),
        "html" | "htm" => Some("text/html"),
        "xml" => Some("application/xml"),
        "json" => Some("application/json"),
        "yaml" | "yml" => Some("application/yaml"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Claimed MIME types that should have recognizable magic bytes.
fn claimed_is_binary(claimed: &str) -> bool {
    if claimed.starts_with("image/")
        || claimed.starts_with("audio/")
        || claimed.starts_with("video/")
    {
        return true;
    }
    matches!(
        claimed,
        "application/pdf" | "application/zip" | "application/gzip" | "application/x-tar"
    )
}
