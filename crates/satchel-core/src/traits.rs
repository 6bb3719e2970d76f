//! Collaborator traits for satchel.
//!
//! The client core talks to three hosted services (auth, records, blobs)
//! plus an audit sink through these interfaces, enabling pluggable backends
//! and testability. Implementations live in `satchel-db` or in the hosting
//! application.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::events::SessionEvent;
use crate::models::{DownloadUrl, NoteFields, NoteRecord, NoteUpdate, ScopeId};

// =============================================================================
// AUTH PROVIDER
// =============================================================================

/// Resolves the caller identity and signals session boundaries.
///
/// Used only to namespace storage paths and to drive reset-and-refetch on
/// identity change; the record store enforces data isolation on its own.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The currently signed-in identity.
    ///
    /// Returns `Error::Unauthorized` when no session is active.
    async fn current_identity(&self) -> Result<ScopeId>;

    /// Subscribe to sign-in/sign-out events from this point onward.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}

// =============================================================================
// RECORD STORE
// =============================================================================

/// Per-caller-isolated CRUD over note records.
///
/// An implementation is bound to one caller scope at construction time;
/// every operation sees only that caller's records. Attachments travel as
/// the ordered manifest of serialized attachment entries on the record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List all of the caller's note records.
    async fn list(&self) -> Result<Vec<NoteRecord>>;

    /// Fetch a single note record, or `None` when it does not exist in this
    /// caller's scope.
    async fn get(&self, id: Uuid) -> Result<Option<NoteRecord>>;

    /// Create a note record with an empty manifest.
    async fn create(&self, fields: NoteFields) -> Result<NoteRecord>;

    /// Apply a partial update and return the updated record.
    async fn update(&self, id: Uuid, update: NoteUpdate) -> Result<NoteRecord>;

    /// Delete a note record.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Hands out per-caller [`RecordStore`] handles.
///
/// The collection view-model re-acquires its record store whenever the
/// signed-in identity changes; backends implement this over whatever shared
/// resource they hold (a pool, a shared map, an SDK client).
pub trait RecordStoreProvider: Send + Sync {
    fn store_for(&self, scope: &ScopeId) -> std::sync::Arc<dyn RecordStore>;
}

// =============================================================================
// BLOB STORE
// =============================================================================

/// Path-addressed binary object storage.
///
/// Paths are opaque strings scoped by caller id; the reconciler generates
/// them and is the only producer.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes at `path`, overwriting any existing object.
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<()>;

    /// Resolve a short-lived download reference for `path`.
    async fn resolve_download_url(&self, path: &str) -> Result<DownloadUrl>;

    /// Delete the object at `path`. Deleting a missing object is not an
    /// error.
    async fn delete(&self, path: &str) -> Result<()>;
}

// =============================================================================
// AUDIT SINK
// =============================================================================

/// Action kinds recorded to the audit sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    NoteCreated,
    NoteUpdated,
    NotesDeleted,
    SortChanged,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteCreated => write!(f, "note_created"),
            Self::NoteUpdated => write!(f, "note_updated"),
            Self::NotesDeleted => write!(f, "notes_deleted"),
            Self::SortChanged => write!(f, "sort_changed"),
        }
    }
}

/// One audited user action.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub occurred_at: DateTime<Utc>,
    /// Caller scope, when a session was active.
    pub scope: Option<ScopeId>,
    pub action: AuditAction,
    /// Action-specific payload (note id, name, file names, ...).
    pub details: JsonValue,
}

impl AuditEvent {
    pub fn new(scope: Option<ScopeId>, action: AuditAction, details: JsonValue) -> Self {
        Self {
            occurred_at: Utc::now(),
            scope,
            action,
            details,
        }
    }
}

/// Receives audit events from the note service and the collection.
///
/// Injected explicitly; there is no process-wide audit log. Recording is
/// fire-and-forget: sinks must not fail the triggering operation.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent);
}

/// No-op sink for when auditing isn't needed.
pub struct NoOpAuditSink;

#[async_trait]
impl AuditSink for NoOpAuditSink {
    async fn record(&self, _event: AuditEvent) {}
}

/// Sink that forwards events to the `tracing` subscriber at INFO.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        info!(
            action = %event.action,
            scope = event.scope.as_ref().map(|s| s.as_str()),
            details = %event.details,
            "audit"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_audit_action_display() {
        assert_eq!(AuditAction::NoteCreated.to_string(), "note_created");
        assert_eq!(AuditAction::NoteUpdated.to_string(), "note_updated");
        assert_eq!(AuditAction::NotesDeleted.to_string(), "notes_deleted");
        assert_eq!(AuditAction::SortChanged.to_string(), "sort_changed");
    }

    #[test]
    fn test_audit_event_serializes_with_scope() {
        let event = AuditEvent::new(
            Some(ScopeId::new("alice")),
            AuditAction::NoteCreated,
            json!({"note_id": "x", "file_count": 2}),
        );
        let serialized = serde_json::to_value(&event).unwrap();
        assert_eq!(serialized["action"], "note_created");
        assert_eq!(serialized["scope"], "alice");
        assert_eq!(serialized["details"]["file_count"], 2);
    }

    #[tokio::test]
    async fn test_noop_sink_accepts_events() {
        let sink = NoOpAuditSink;
        sink.record(AuditEvent::new(None, AuditAction::SortChanged, json!({})))
            .await;
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_events() {
        let sink = TracingAuditSink;
        sink.record(AuditEvent::new(
            Some(ScopeId::new("bob")),
            AuditAction::NotesDeleted,
            json!({"note_count": 3}),
        ))
        .await;
    }
}
