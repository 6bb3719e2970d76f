//! Note collection view-model.
//!
//! Maintains the signed-in caller's notes sorted by creation time with a
//! resolved download reference per attachment, plus the selection state the
//! presentation layer operates on. Mutations go through the note service;
//! afterwards only the affected note(s) are re-fetched, so the displayed
//! list always matches the last completed mutation without full reloads.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use satchel_core::{
    AuditAction, AuditEvent, AuditSink, AuthProvider, BlobStore, DownloadUrl, Error, IncomingFile,
    Note, NoteFields, NoteRecord, RecordStore, RecordStoreProvider, Result, ScopeId, SessionEvent,
    SortOrder,
};

use crate::service::{NoteService, NoteWriteResult};

/// One attachment with its resolved download reference.
///
/// `download` is `None` when resolution failed; the attachment is still
/// listed.
#[derive(Debug, Clone)]
pub struct AttachmentView {
    pub attachment: satchel_core::Attachment,
    pub download: Option<DownloadUrl>,
}

/// One note as displayed.
#[derive(Debug, Clone)]
pub struct NoteView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub attachments: Vec<AttachmentView>,
}

/// The collection view-model: a single logical actor driven by
/// user-initiated calls and session events.
pub struct NoteCollection {
    auth: Arc<dyn AuthProvider>,
    stores: Arc<dyn RecordStoreProvider>,
    blobs: Arc<dyn BlobStore>,
    audit: Arc<dyn AuditSink>,
    service: NoteService,
    session_rx: broadcast::Receiver<SessionEvent>,
    scope: Option<ScopeId>,
    notes: Vec<NoteView>,
    selection: HashSet<Uuid>,
    sort: SortOrder,
}

impl NoteCollection {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        stores: Arc<dyn RecordStoreProvider>,
        blobs: Arc<dyn BlobStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let session_rx = auth.subscribe();
        let service = NoteService::new(
            Arc::clone(&auth),
            Arc::clone(&stores),
            Arc::clone(&blobs),
            Arc::clone(&audit),
        );
        Self {
            auth,
            stores,
            blobs,
            audit,
            service,
            session_rx,
            scope: None,
            notes: Vec::new(),
            selection: HashSet::new(),
            sort: SortOrder::default(),
        }
    }

    // ─── Read surface ──────────────────────────────────────────────────────

    pub fn notes(&self) -> &[NoteView] {
        &self.notes
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort
    }

    pub fn selection(&self) -> &HashSet<Uuid> {
        &self.selection
    }

    pub fn is_selected(&self, id: Uuid) -> bool {
        self.selection.contains(&id)
    }

    // ─── Selection ─────────────────────────────────────────────────────────

    /// Toggle a note in or out of the selection.
    pub fn toggle_selected(&mut self, id: Uuid) {
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ─── Fetching ──────────────────────────────────────────────────────────

    async fn current_store(&mut self) -> Result<Arc<dyn RecordStore>> {
        let scope = self.auth.current_identity().await?;
        let store = self.stores.store_for(&scope);
        self.scope = Some(scope);
        Ok(store)
    }

    /// Full reload: fetch every note and resolve fresh download links.
    pub async fn refresh(&mut self) -> Result<()> {
        let store = self.current_store().await?;
        let records = store.list().await?;
        debug!(note_count = records.len(), "collection refreshed");

        let mut views = Vec::with_capacity(records.len());
        for record in records {
            views.push(self.build_view(record).await);
        }
        self.notes = views;
        self.sort_notes();
        Ok(())
    }

    /// Re-fetch a single note and splice it into the sorted list; removes
    /// it when the record no longer exists.
    async fn invalidate_note(&mut self, id: Uuid) -> Result<()> {
        let store = self.current_store().await?;
        match store.get(id).await? {
            Some(record) => {
                let view = self.build_view(record).await;
                self.notes.retain(|n| n.id != id);
                self.notes.push(view);
                self.sort_notes();
            }
            None => {
                self.notes.retain(|n| n.id != id);
                self.selection.remove(&id);
            }
        }
        Ok(())
    }

    async fn build_view(&self, record: NoteRecord) -> NoteView {
        let note = Note::from_record(record);
        let mut attachments = Vec::with_capacity(note.attachments.len());
        for attachment in note.attachments {
            let download = match self.blobs.resolve_download_url(&attachment.storage_path).await
            {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(
                        storage_path = %attachment.storage_path,
                        error = %e,
                        "attachment listed without download link"
                    );
                    None
                }
            };
            attachments.push(AttachmentView {
                attachment,
                download,
            });
        }
        NoteView {
            id: note.id,
            name: note.name,
            description: note.description,
            created_at: note.created_at,
            attachments,
        }
    }

    fn sort_notes(&mut self) {
        match self.sort {
            SortOrder::Asc => self
                .notes
                .sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))),
            SortOrder::Desc => self
                .notes
                .sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))),
        }
    }

    /// Flip the sort order and re-sort the loaded list.
    pub async fn toggle_sort(&mut self) {
        self.sort = self.sort.toggled();
        self.sort_notes();
        self.audit
            .record(AuditEvent::new(
                self.scope.clone(),
                AuditAction::SortChanged,
                json!({ "sort_order": self.sort.to_string() }),
            ))
            .await;
    }

    // ─── Mutations ─────────────────────────────────────────────────────────

    /// Create a note from the form fields and files, then refresh only the
    /// new note.
    pub async fn create(
        &mut self,
        fields: NoteFields,
        files: Vec<IncomingFile>,
    ) -> Result<NoteWriteResult> {
        let result = self.service.create_note(fields, files).await?;
        self.invalidate_note(result.note.id).await?;
        Ok(result)
    }

    /// Update the single selected note, then refresh only that note.
    ///
    /// Requires exactly one selected note; anything else is a usage error
    /// and performs no I/O.
    pub async fn update_selected(
        &mut self,
        fields: NoteFields,
        files: Vec<IncomingFile>,
    ) -> Result<NoteWriteResult> {
        let mut ids = self.selection.iter();
        let id = match (ids.next(), ids.next()) {
            (Some(&id), None) => id,
            _ => {
                return Err(Error::Selection(
                    "update requires exactly one selected note".to_string(),
                ))
            }
        };

        let result = self.service.update_note(id, fields, files).await?;
        self.invalidate_note(id).await?;
        Ok(result)
    }

    /// Delete every selected note, then drop them from the list.
    ///
    /// Requires a non-empty selection; an empty one is a usage error and
    /// performs no I/O.
    pub async fn delete_selected(&mut self) -> Result<()> {
        if self.selection.is_empty() {
            return Err(Error::Selection(
                "delete requires at least one selected note".to_string(),
            ));
        }

        let ids: Vec<Uuid> = self.selection.iter().copied().collect();
        let result = self.service.delete_notes(&ids).await;

        // Re-check each affected id so the list reflects exactly what the
        // sweep completed, even on partial failure.
        for id in ids {
            self.invalidate_note(id).await?;
        }
        self.selection.clear();
        result
    }

    // ─── Session boundaries ────────────────────────────────────────────────

    /// Apply one session event: deterministic reset, then refetch when a
    /// caller is signed in.
    pub async fn handle_session_event(&mut self, event: SessionEvent) -> Result<()> {
        self.reset();
        match event {
            SessionEvent::SignedIn(_) => self.refresh().await,
            SessionEvent::SignedOut => Ok(()),
        }
    }

    /// Drain any pending session events from the auth provider.
    pub async fn process_session_events(&mut self) -> Result<()> {
        loop {
            match self.session_rx.try_recv() {
                Ok(event) => self.handle_session_event(event).await?,
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    // Events were missed; fall back to a full reset against
                    // the current identity.
                    self.reset();
                    if self.auth.current_identity().await.is_ok() {
                        self.refresh().await?;
                    }
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.notes.clear();
        self.selection.clear();
        self.sort = SortOrder::default();
        self.scope = None;
    }
}
