//! Centralized default constants for the satchel system.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers. Each constant has a `SATCHEL_*` environment variable
//! override where a runtime knob makes sense.

// =============================================================================
// UPLOADS
// =============================================================================

/// Maximum accepted upload size in bytes (100 MiB).
pub const MAX_UPLOAD_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Maximum byte length of a sanitized filename.
pub const FILENAME_MAX_BYTES: usize = 255;

/// Placeholder returned by the sanitizer for empty or blank filenames.
pub const PLACEHOLDER_FILENAME: &str = "unnamed_file";

/// Path prefix under which attachment blobs are stored.
///
/// Full blob paths have the form `{prefix}/{scope}/{attachment_id}_{name}`.
pub const STORAGE_PREFIX: &str = "media";

// =============================================================================
// DOWNLOAD REFERENCES
// =============================================================================

/// Lifetime of a resolved download reference in seconds (15 minutes).
pub const DOWNLOAD_URL_TTL_SECS: i64 = 900;

// =============================================================================
// AUDIT
// =============================================================================

/// Number of events the in-memory audit sink retains.
pub const AUDIT_LOG_CAPACITY: usize = 100;

// =============================================================================
// EVENTS
// =============================================================================

/// Session event broadcast channel capacity.
pub const SESSION_BUS_CAPACITY: usize = 64;

/// Read `SATCHEL_MAX_UPLOAD_SIZE_BYTES` from the environment, falling back
/// to [`MAX_UPLOAD_SIZE_BYTES`] when unset or unparsable.
pub fn max_upload_size_bytes() -> u64 {
    std::env::var("SATCHEL_MAX_UPLOAD_SIZE_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(MAX_UPLOAD_SIZE_BYTES)
}

/// Read `SATCHEL_DOWNLOAD_URL_TTL_SECS` from the environment, falling back
/// to [`DOWNLOAD_URL_TTL_SECS`] when unset or unparsable.
pub fn download_url_ttl_secs() -> i64 {
    std::env::var("SATCHEL_DOWNLOAD_URL_TTL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DOWNLOAD_URL_TTL_SECS)
}
