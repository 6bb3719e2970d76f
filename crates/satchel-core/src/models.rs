//! Core data model: notes, attachments, and the persisted manifest form.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;

// =============================================================================
// IDENTITY
// =============================================================================

/// Opaque caller identity used to namespace storage paths per caller.
///
/// Comparison is byte-exact; the value itself is issued by the auth provider
/// and never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(String);

impl ScopeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// File attachment metadata, distinct from the bytes it points to.
///
/// Logical identity for reconciliation is `filename` (the original,
/// user-supplied name), never `id`: re-uploading `report.pdf` replaces the
/// existing `report.pdf` entry. `storage_path` embeds a freshly minted id,
/// so physical paths never collide even when sanitized names do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub filename: String,
    pub storage_path: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Attachment {
    /// Serialize into the self-contained manifest entry persisted on the
    /// note record.
    pub fn to_manifest_entry(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a single manifest entry.
    pub fn from_manifest_entry(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Serialize an attachment sequence into its ordered manifest form.
pub fn to_manifest(attachments: &[Attachment]) -> Result<Vec<String>> {
    attachments.iter().map(Attachment::to_manifest_entry).collect()
}

/// Parse a persisted manifest, skipping entries that fail to deserialize.
///
/// Tolerant by contract: a corrupt entry costs that one attachment, not the
/// whole note.
pub fn parse_manifest(entries: &[String]) -> Vec<Attachment> {
    entries
        .iter()
        .filter_map(|raw| match Attachment::from_manifest_entry(raw) {
            Ok(attachment) => Some(attachment),
            Err(e) => {
                warn!(error = %e, "skipping unreadable manifest entry");
                None
            }
        })
        .collect()
}

/// A file chosen for upload: the original name, the claimed MIME type, and
/// the raw bytes.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl IncomingFile {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

// =============================================================================
// NOTES
// =============================================================================

/// User-editable note fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteFields {
    pub name: String,
    pub description: String,
}

/// Partial update applied to a note record. `None` fields are left as-is.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Replacement attachment manifest (ordered, serialized entries).
    pub manifest: Option<Vec<String>>,
}

/// A note as stored in the record store: the manifest is kept in its
/// serialized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub manifest: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A note with its attachment manifest parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Build a note from its stored record, tolerating corrupt manifest
    /// entries.
    pub fn from_record(record: NoteRecord) -> Self {
        let attachments = parse_manifest(&record.manifest);
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            attachments,
            created_at: record.created_at,
        }
    }
}

// =============================================================================
// DOWNLOAD REFERENCES
// =============================================================================

/// Short-lived download reference resolved from the blob store.
///
/// Never persisted; recomputed on every list refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// SORTING
// =============================================================================

/// Collection sort order over note creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}
