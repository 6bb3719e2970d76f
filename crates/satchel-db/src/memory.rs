//! In-memory implementations of the collaborator traits.
//!
//! Used by tests across the workspace and by embedders that want satchel
//! without hosted services. The blob store journals every operation it is
//! asked to perform and supports injected failures, so tests can assert
//! exactly which storage side effects an algorithm produced.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use satchel_core::defaults::{download_url_ttl_secs, AUDIT_LOG_CAPACITY};
use satchel_core::{
    AuditEvent, AuditSink, AuthProvider, BlobStore, DownloadUrl, Error, NoteFields, NoteRecord,
    NoteUpdate, RecordStore, RecordStoreProvider, Result, ScopeId, SessionBus, SessionEvent,
};

// =============================================================================
// RECORD STORE
// =============================================================================

/// Shared root of the in-memory record store.
///
/// Holds every caller's records; [`MemoryRecords::scoped`] hands out
/// per-caller [`MemoryRecordStore`] handles that can only see their own
/// scope, mirroring the isolation a hosted document store enforces.
#[derive(Clone, Default)]
pub struct MemoryRecords {
    tenants: Arc<RwLock<HashMap<ScopeId, HashMap<Uuid, NoteRecord>>>>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record store handle bound to `scope`.
    pub fn scoped(&self, scope: ScopeId) -> MemoryRecordStore {
        MemoryRecordStore {
            scope,
            tenants: Arc::clone(&self.tenants),
        }
    }
}

impl RecordStoreProvider for MemoryRecords {
    fn store_for(&self, scope: &ScopeId) -> Arc<dyn RecordStore> {
        Arc::new(self.scoped(scope.clone()))
    }
}

/// Record store handle for a single caller scope.
pub struct MemoryRecordStore {
    scope: ScopeId,
    tenants: Arc<RwLock<HashMap<ScopeId, HashMap<Uuid, NoteRecord>>>>,
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list(&self) -> Result<Vec<NoteRecord>> {
        let tenants = self.tenants.read().await;
        let mut records: Vec<NoteRecord> = tenants
            .get(&self.scope)
            .map(|notes| notes.values().cloned().collect())
            .unwrap_or_default();
        // Deterministic order for callers that don't re-sort.
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn get(&self, id: Uuid) -> Result<Option<NoteRecord>> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .get(&self.scope)
            .and_then(|notes| notes.get(&id))
            .cloned())
    }

    async fn create(&self, fields: NoteFields) -> Result<NoteRecord> {
        let record = NoteRecord {
            id: Uuid::now_v7(),
            name: fields.name,
            description: fields.description,
            manifest: Vec::new(),
            created_at: Utc::now(),
        };
        let mut tenants = self.tenants.write().await;
        tenants
            .entry(self.scope.clone())
            .or_default()
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: Uuid, update: NoteUpdate) -> Result<NoteRecord> {
        let mut tenants = self.tenants.write().await;
        let record = tenants
            .get_mut(&self.scope)
            .and_then(|notes| notes.get_mut(&id))
            .ok_or(Error::NoteNotFound(id))?;

        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(description) = update.description {
            record.description = description;
        }
        if let Some(manifest) = update.manifest {
            record.manifest = manifest;
        }
        Ok(record.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tenants = self.tenants.write().await;
        let removed = tenants
            .get_mut(&self.scope)
            .and_then(|notes| notes.remove(&id));
        if removed.is_none() {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }
}

// =============================================================================
// BLOB STORE
// =============================================================================

/// One operation the blob store was asked to perform, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobOp {
    Put { path: String, size_bytes: u64 },
    Delete { path: String },
    Resolve { path: String },
}

/// A stored object: bytes plus the content type recorded at put time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
struct MemoryBlobState {
    objects: HashMap<String, StoredBlob>,
    journal: Vec<BlobOp>,
    fail_put_markers: Vec<String>,
    fail_delete_markers: Vec<String>,
    fail_resolve_markers: Vec<String>,
}

/// In-memory blob store with an operation journal and injectable failures.
///
/// Every put/delete/resolve is journaled when *attempted*, before any
/// injected failure fires, so tests can assert which calls were issued
/// regardless of outcome.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    state: Arc<RwLock<MemoryBlobState>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent put whose path contains `marker` fail.
    pub async fn fail_put_containing(&self, marker: &str) {
        self.state
            .write()
            .await
            .fail_put_markers
            .push(marker.to_string());
    }

    /// Make every subsequent delete whose path contains `marker` fail.
    pub async fn fail_delete_containing(&self, marker: &str) {
        self.state
            .write()
            .await
            .fail_delete_markers
            .push(marker.to_string());
    }

    /// Make every subsequent URL resolution whose path contains `marker`
    /// fail.
    pub async fn fail_resolve_containing(&self, marker: &str) {
        self.state
            .write()
            .await
            .fail_resolve_markers
            .push(marker.to_string());
    }

    /// All operations attempted so far, in call order.
    pub async fn journal(&self) -> Vec<BlobOp> {
        self.state.read().await.journal.clone()
    }

    /// Number of objects currently stored.
    pub async fn object_count(&self) -> usize {
        self.state.read().await.objects.len()
    }

    /// Whether an object exists at `path`.
    pub async fn contains(&self, path: &str) -> bool {
        self.state.read().await.objects.contains_key(path)
    }

    /// Fetch a stored object.
    pub async fn get(&self, path: &str) -> Option<StoredBlob> {
        self.state.read().await.objects.get(path).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.journal.push(BlobOp::Put {
            path: path.to_string(),
            size_bytes: data.len() as u64,
        });
        if state.fail_put_markers.iter().any(|m| path.contains(m)) {
            return Err(Error::BlobWrite {
                path: path.to_string(),
                reason: "injected put failure".to_string(),
            });
        }
        state.objects.insert(
            path.to_string(),
            StoredBlob {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn resolve_download_url(&self, path: &str) -> Result<DownloadUrl> {
        let mut state = self.state.write().await;
        state.journal.push(BlobOp::Resolve {
            path: path.to_string(),
        });
        if state.fail_resolve_markers.iter().any(|m| path.contains(m)) {
            return Err(Error::Internal(format!(
                "injected resolve failure for {path}"
            )));
        }
        let expires_at = Utc::now() + Duration::seconds(download_url_ttl_secs());
        Ok(DownloadUrl {
            url: format!("memory://{path}"),
            expires_at,
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.journal.push(BlobOp::Delete {
            path: path.to_string(),
        });
        if state.fail_delete_markers.iter().any(|m| path.contains(m)) {
            return Err(Error::BlobDelete {
                path: path.to_string(),
                reason: "injected delete failure".to_string(),
            });
        }
        state.objects.remove(path);
        Ok(())
    }
}

// =============================================================================
// AUDIT SINK
// =============================================================================

/// Audit sink retaining the most recent events in memory.
pub struct MemoryAuditSink {
    events: Arc<RwLock<VecDeque<AuditEvent>>>,
    capacity: usize,
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::with_capacity(AUDIT_LOG_CAPACITY)
    }
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::new(RwLock::new(VecDeque::new())),
            capacity,
        }
    }

    /// Retained events, oldest first.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.iter().cloned().collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: AuditEvent) {
        let mut events = self.events.write().await;
        events.push_back(event);
        while events.len() > self.capacity {
            events.pop_front();
        }
    }
}

// =============================================================================
// AUTH PROVIDER
// =============================================================================

/// Auth provider with a settable identity, emitting session events on
/// change.
pub struct StaticAuthProvider {
    identity: Arc<RwLock<Option<ScopeId>>>,
    bus: SessionBus,
}

impl StaticAuthProvider {
    /// Start with an active session for `scope`.
    pub fn signed_in(scope: ScopeId) -> Self {
        Self {
            identity: Arc::new(RwLock::new(Some(scope))),
            bus: SessionBus::new(),
        }
    }

    /// Start with no active session.
    pub fn signed_out() -> Self {
        Self {
            identity: Arc::new(RwLock::new(None)),
            bus: SessionBus::new(),
        }
    }

    /// Switch the active identity and notify subscribers.
    pub async fn sign_in(&self, scope: ScopeId) {
        *self.identity.write().await = Some(scope.clone());
        self.bus.emit(SessionEvent::SignedIn(scope));
    }

    /// End the active session and notify subscribers.
    pub async fn sign_out(&self) {
        *self.identity.write().await = None;
        self.bus.emit(SessionEvent::SignedOut);
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn current_identity(&self) -> Result<ScopeId> {
        self.identity
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Unauthorized("no active session".to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }
}
