//! Structured logging schema and field name constants for satchel.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values |
//! | TRACE | Per-item iteration (per-attachment, per-manifest-entry) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "client", "db", "reconcile"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "create_note", "update_note", "reconcile", "resolve_url"
pub const OPERATION: &str = "op";

/// Caller scope id namespacing the operation.
pub const SCOPE: &str = "scope";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Attachment UUID being operated on.
pub const ATTACHMENT_ID: &str = "attachment_id";

/// Original (user-supplied) filename of an attachment.
pub const FILENAME: &str = "filename";

/// Blob store path of an attachment.
pub const STORAGE_PATH: &str = "storage_path";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Number of files in a submitted batch.
pub const FILE_COUNT: &str = "file_count";

/// Number of notes returned by a list or affected by a bulk operation.
pub const NOTE_COUNT: &str = "note_count";

/// Byte size of an upload.
pub const SIZE_BYTES: &str = "size_bytes";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
