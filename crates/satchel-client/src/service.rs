//! Note service: orchestrates the record store, the blob store, and the
//! reconciler for every note mutation, and reports each one to the audit
//! sink.

use std::sync::Arc;

use futures::future;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use satchel_core::{
    parse_manifest, to_manifest, AuditAction, AuditEvent, AuditSink, AuthProvider, BlobStore,
    Error, IncomingFile, Note, NoteFields, NoteUpdate, RecordStore, RecordStoreProvider, Result,
    ScopeId,
};

use crate::reconcile::{AttachmentReconciler, FileOutcome};

/// Result of a note write: the persisted note plus one outcome per
/// submitted file.
#[derive(Debug)]
pub struct NoteWriteResult {
    pub note: Note,
    pub files: Vec<FileOutcome>,
}

/// Orchestrates note mutations over the collaborator traits.
pub struct NoteService {
    auth: Arc<dyn AuthProvider>,
    stores: Arc<dyn RecordStoreProvider>,
    blobs: Arc<dyn BlobStore>,
    audit: Arc<dyn AuditSink>,
    reconciler: AttachmentReconciler,
}

impl NoteService {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        stores: Arc<dyn RecordStoreProvider>,
        blobs: Arc<dyn BlobStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let reconciler = AttachmentReconciler::new(Arc::clone(&blobs));
        Self {
            auth,
            stores,
            blobs,
            audit,
            reconciler,
        }
    }

    fn validate_fields(fields: &NoteFields) -> Result<()> {
        if fields.name.trim().is_empty() {
            return Err(Error::InvalidInput("note name is required".to_string()));
        }
        Ok(())
    }

    async fn scope(&self) -> Result<ScopeId> {
        self.auth.current_identity().await
    }

    /// Create a note, then upload and attach the submitted files.
    ///
    /// Two-phase by design: the record is created with an empty manifest,
    /// uploads run, and a second write persists the manifest. An
    /// interruption between the writes leaves a note without attachments
    /// and possibly orphan blobs; sweeping unreferenced blobs is an
    /// operational safeguard outside this crate.
    pub async fn create_note(
        &self,
        fields: NoteFields,
        files: Vec<IncomingFile>,
    ) -> Result<NoteWriteResult> {
        Self::validate_fields(&fields)?;
        let scope = self.scope().await?;
        let records = self.stores.store_for(&scope);

        let name = fields.name.clone();
        let file_names: Vec<String> = files.iter().map(|f| f.filename.clone()).collect();

        let record = records.create(fields).await?;

        let (record, outcomes) = if files.is_empty() {
            (record, Vec::new())
        } else {
            let outcome = self.reconciler.reconcile(&scope, Vec::new(), files).await;
            let manifest = to_manifest(&outcome.attachments)?;
            let record = records
                .update(
                    record.id,
                    NoteUpdate {
                        manifest: Some(manifest),
                        ..Default::default()
                    },
                )
                .await?;
            (record, outcome.files)
        };

        info!(note_id = %record.id, file_count = file_names.len(), "note created");
        self.audit
            .record(AuditEvent::new(
                Some(scope),
                AuditAction::NoteCreated,
                json!({
                    "note_id": record.id,
                    "name": name,
                    "file_count": file_names.len(),
                    "file_names": file_names,
                }),
            ))
            .await;

        Ok(NoteWriteResult {
            note: Note::from_record(record),
            files: outcomes,
        })
    }

    /// Update a note's fields and merge the submitted files into its
    /// attachments, persisting everything in one record write.
    pub async fn update_note(
        &self,
        id: Uuid,
        fields: NoteFields,
        files: Vec<IncomingFile>,
    ) -> Result<NoteWriteResult> {
        Self::validate_fields(&fields)?;
        let scope = self.scope().await?;
        let records = self.stores.store_for(&scope);

        let existing = records.get(id).await?.ok_or(Error::NoteNotFound(id))?;
        let current = parse_manifest(&existing.manifest);

        let file_names: Vec<String> = files.iter().map(|f| f.filename.clone()).collect();
        let outcome = self.reconciler.reconcile(&scope, current, files).await;
        let manifest = to_manifest(&outcome.attachments)?;

        let record = records
            .update(
                id,
                NoteUpdate {
                    name: Some(fields.name.clone()),
                    description: Some(fields.description),
                    manifest: Some(manifest),
                },
            )
            .await?;

        info!(note_id = %record.id, file_count = file_names.len(), "note updated");
        self.audit
            .record(AuditEvent::new(
                Some(scope),
                AuditAction::NoteUpdated,
                json!({
                    "note_id": record.id,
                    "name": fields.name,
                    "file_count": file_names.len(),
                    "file_names": file_names,
                }),
            ))
            .await;

        Ok(NoteWriteResult {
            note: Note::from_record(record),
            files: outcome.files,
        })
    }

    /// Delete a note and release its attachment blobs.
    pub async fn delete_note(&self, id: Uuid) -> Result<()> {
        self.delete_notes(&[id]).await
    }

    /// Delete several notes, fanning out across them. Blobs within a note
    /// are released sequentially; record deletion is not conditioned on
    /// blob deletion success.
    ///
    /// Every requested note is attempted; the first record store failure is
    /// surfaced after the sweep completes.
    pub async fn delete_notes(&self, ids: &[Uuid]) -> Result<()> {
        let scope = self.scope().await?;
        let records = self.stores.store_for(&scope);

        let results =
            future::join_all(ids.iter().map(|id| self.delete_one(records.as_ref(), *id))).await;

        let mut deleted_names = Vec::new();
        let mut first_err = None;
        for result in results {
            match result {
                Ok(name) => deleted_names.push(name),
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }

        info!(note_count = deleted_names.len(), "notes deleted");
        self.audit
            .record(AuditEvent::new(
                Some(scope),
                AuditAction::NotesDeleted,
                json!({
                    "note_count": deleted_names.len(),
                    "note_names": deleted_names,
                }),
            ))
            .await;

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn delete_one(&self, records: &dyn RecordStore, id: Uuid) -> Result<String> {
        let record = records.get(id).await?.ok_or(Error::NoteNotFound(id))?;

        // Release blobs first: the manifest on this record is the only
        // durable pointer to them. A failed delete orphans that one blob.
        for attachment in parse_manifest(&record.manifest) {
            if let Err(e) = self.blobs.delete(&attachment.storage_path).await {
                warn!(
                    note_id = %id,
                    storage_path = %attachment.storage_path,
                    error = %e,
                    "orphaned blob left behind by note deletion"
                );
            }
        }

        records.delete(id).await?;
        Ok(record.name)
    }
}
