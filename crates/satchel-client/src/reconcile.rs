//! Attachment reconciliation.
//!
//! Merges a batch of newly chosen files into a note's existing attachment
//! list and performs the blob store side effects needed to realize the
//! result. Replacement is keyed on the *original* filename, so re-uploading
//! `report.pdf` overwrites the existing entry instead of duplicating it;
//! storage paths embed a freshly minted id, so physical paths never collide
//! even when sanitized names do.
//!
//! Files are processed strictly in submission order: later files must
//! observe replacements made by earlier files in the same batch.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use satchel_core::defaults::{max_upload_size_bytes, STORAGE_PREFIX};
use satchel_core::{
    detect_content_type, sanitize_filename, validate_upload, Attachment, BlobStore, Error,
    IncomingFile, ScopeId,
};

/// How an incoming file landed in the attachment sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDisposition {
    /// Replaced an existing attachment with the same filename, in place.
    Replaced,
    /// Appended to the end of the sequence.
    Appended,
}

/// Per-file result of a reconciliation batch, in submission order.
#[derive(Debug)]
pub struct FileOutcome {
    pub filename: String,
    pub result: Result<FileDisposition, Error>,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Result of reconciling one batch.
#[derive(Debug)]
pub struct ReconcileOutcome {
    /// The next attachment sequence, to be persisted by the caller.
    pub attachments: Vec<Attachment>,
    /// One outcome per incoming file, in submission order.
    pub files: Vec<FileOutcome>,
}

impl ReconcileOutcome {
    pub fn has_failures(&self) -> bool {
        self.files.iter().any(|f| !f.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| !f.is_ok())
    }
}

/// The reconciliation algorithm over a [`BlobStore`].
pub struct AttachmentReconciler {
    blobs: Arc<dyn BlobStore>,
    max_upload_bytes: u64,
}

impl AttachmentReconciler {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            max_upload_bytes: max_upload_size_bytes(),
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Caller-scoped storage path for a fresh upload:
    /// `media/{scope}/{id}_{sanitized-name}`.
    fn storage_path(scope: &ScopeId, id: Uuid, filename: &str) -> String {
        format!(
            "{}/{}/{}_{}",
            STORAGE_PREFIX,
            scope,
            id,
            sanitize_filename(filename)
        )
    }

    /// Merge `incoming` into `current`, in submission order.
    ///
    /// A failure is local to its file: the batch continues and the caller
    /// receives one outcome per file. No attachment enters the returned
    /// sequence unless its put succeeded.
    pub async fn reconcile(
        &self,
        scope: &ScopeId,
        current: Vec<Attachment>,
        incoming: Vec<IncomingFile>,
    ) -> ReconcileOutcome {
        let mut attachments = current;
        let mut files = Vec::with_capacity(incoming.len());

        for file in incoming {
            let result = self.apply(scope, &mut attachments, &file).await;
            if let Err(e) = &result {
                warn!(filename = %file.filename, error = %e, "file skipped during reconciliation");
            }
            files.push(FileOutcome {
                filename: file.filename,
                result,
            });
        }

        ReconcileOutcome { attachments, files }
    }

    async fn apply(
        &self,
        scope: &ScopeId,
        attachments: &mut Vec<Attachment>,
        file: &IncomingFile,
    ) -> Result<FileDisposition, Error> {
        validate_upload(&file.filename, file.size_bytes(), self.max_upload_bytes)?;

        // Logical identity is the original filename, byte-exact.
        let existing = attachments
            .iter()
            .position(|a| a.filename == file.filename);

        match existing {
            Some(index) => {
                // The old copy goes first so two live copies never coexist.
                // A failed delete leaves an orphan; it must not block the
                // replacement.
                let old_path = attachments[index].storage_path.clone();
                if let Err(e) = self.blobs.delete(&old_path).await {
                    warn!(storage_path = %old_path, error = %e, "stale blob left behind during replacement");
                }

                let replacement = self.upload(scope, file).await?;
                attachments[index] = replacement;
                Ok(FileDisposition::Replaced)
            }
            None => {
                let appended = self.upload(scope, file).await?;
                attachments.push(appended);
                Ok(FileDisposition::Appended)
            }
        }
    }

    async fn upload(&self, scope: &ScopeId, file: &IncomingFile) -> Result<Attachment, Error> {
        let id = Uuid::now_v7();
        let path = Self::storage_path(scope, id, &file.filename);
        let content_type = detect_content_type(&file.filename, &file.data, &file.content_type);

        self.blobs
            .put(&path, &file.data, &content_type)
            .await
            .map_err(|e| match e {
                already @ Error::BlobWrite { .. } => already,
                other => Error::BlobWrite {
                    path: path.clone(),
                    reason: other.to_string(),
                },
            })?;

        debug!(
            attachment_id = %id,
            storage_path = %path,
            size_bytes = file.data.len(),
            "attachment blob uploaded"
        );

        Ok(Attachment {
            id,
            filename: file.filename.clone(),
            storage_path: path,
            size_bytes: file.data.len() as i64,
            content_type,
            uploaded_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_db::{BlobOp, MemoryBlobStore};

    fn scope() -> ScopeId {
        ScopeId::new("user-1")
    }

    fn reconciler(blobs: &MemoryBlobStore) -> AttachmentReconciler {
        AttachmentReconciler::new(Arc::new(blobs.clone()))
    }

    fn file(name: &str, data: &[u8]) -> IncomingFile {
        IncomingFile::new(name, "text/plain", data.to_vec())
    }

    async fn seeded(
        blobs: &MemoryBlobStore,
        names: &[&str],
    ) -> Vec<Attachment> {
        let outcome = reconciler(blobs)
            .reconcile(
                &scope(),
                Vec::new(),
                names.iter().map(|n| file(n, b"seed")).collect(),
            )
            .await;
        assert!(!outcome.has_failures());
        outcome.attachments
    }

    #[tokio::test]
    async fn test_empty_batch_on_empty_note_touches_nothing() {
        let blobs = MemoryBlobStore::new();
        let outcome = reconciler(&blobs)
            .reconcile(&scope(), Vec::new(), Vec::new())
            .await;

        assert!(outcome.attachments.is_empty());
        assert!(outcome.files.is_empty());
        assert!(blobs.journal().await.is_empty());
    }

    #[tokio::test]
    async fn test_new_names_append_in_order() {
        let blobs = MemoryBlobStore::new();
        let outcome = reconciler(&blobs)
            .reconcile(
                &scope(),
                Vec::new(),
                vec![file("a.txt", b"1"), file("b.txt", b"2"), file("c.txt", b"3")],
            )
            .await;

        let names: Vec<&str> = outcome
            .attachments
            .iter()
            .map(|a| a.filename.as_str())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
        assert!(outcome
            .files
            .iter()
            .all(|f| matches!(f.result, Ok(FileDisposition::Appended))));
        assert_eq!(blobs.object_count().await, 3);
    }

    #[tokio::test]
    async fn test_same_name_replaces_in_place() {
        let blobs = MemoryBlobStore::new();
        let current = seeded(&blobs, &["a.pdf", "b.png"]).await;
        let old_a = current[0].clone();

        let outcome = reconciler(&blobs)
            .reconcile(&scope(), current, vec![file("a.pdf", b"new bytes")])
            .await;

        // Count unchanged, position preserved, fresh id and path.
        assert_eq!(outcome.attachments.len(), 2);
        assert_eq!(outcome.attachments[0].filename, "a.pdf");
        assert_eq!(outcome.attachments[1].filename, "b.png");
        assert_ne!(outcome.attachments[0].id, old_a.id);
        assert_ne!(outcome.attachments[0].storage_path, old_a.storage_path);
        assert!(matches!(
            outcome.files[0].result,
            Ok(FileDisposition::Replaced)
        ));

        // Old blob deleted, new blob present.
        assert!(!blobs.contains(&old_a.storage_path).await);
        assert!(blobs.contains(&outcome.attachments[0].storage_path).await);
    }

    #[tokio::test]
    async fn test_replacement_then_append_scenario() {
        // current = [a.pdf@p1], incoming = [a.pdf, b.png]
        // → [a.pdf@p2, b.png@p3]; delete issued for p1, puts for p2 and p3.
        let blobs = MemoryBlobStore::new();
        let current = seeded(&blobs, &["a.pdf"]).await;
        let p1 = current[0].storage_path.clone();

        let outcome = reconciler(&blobs)
            .reconcile(
                &scope(),
                current,
                vec![file("a.pdf", b"X"), file("b.png", b"Y")],
            )
            .await;

        assert_eq!(outcome.attachments.len(), 2);
        assert_eq!(outcome.attachments[0].filename, "a.pdf");
        assert_ne!(outcome.attachments[0].storage_path, p1);
        assert_eq!(outcome.attachments[1].filename, "b.png");

        let ops = blobs.journal().await;
        let batch_ops = &ops[1..]; // skip the seeding put
        assert_eq!(
            batch_ops[0],
            BlobOp::Delete { path: p1 }
        );
        assert!(matches!(batch_ops[1], BlobOp::Put { .. }));
        assert!(matches!(batch_ops[2], BlobOp::Put { .. }));
        assert_eq!(batch_ops.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_precedes_put_on_replacement() {
        let blobs = MemoryBlobStore::new();
        let current = seeded(&blobs, &["doc.txt"]).await;
        let old_path = current[0].storage_path.clone();

        reconciler(&blobs)
            .reconcile(&scope(), current, vec![file("doc.txt", b"v2")])
            .await;

        let ops = blobs.journal().await;
        let delete_idx = ops
            .iter()
            .position(|op| op == &BlobOp::Delete { path: old_path.clone() })
            .expect("delete for the old path must be issued");
        let put_idx = ops
            .iter()
            .rposition(|op| matches!(op, BlobOp::Put { .. }))
            .expect("put for the new path must be issued");
        assert!(delete_idx < put_idx);
    }

    #[tokio::test]
    async fn test_failed_delete_is_swallowed() {
        let blobs = MemoryBlobStore::new();
        let current = seeded(&blobs, &["pinned.txt"]).await;
        blobs.fail_delete_containing("pinned").await;

        let outcome = reconciler(&blobs)
            .reconcile(&scope(), current, vec![file("pinned.txt", b"v2")])
            .await;

        // Replacement still succeeds; the old blob is an orphan now.
        assert!(!outcome.has_failures());
        assert!(matches!(
            outcome.files[0].result,
            Ok(FileDisposition::Replaced)
        ));
        assert_eq!(outcome.attachments.len(), 1);
    }

    #[tokio::test]
    async fn test_put_failure_skips_only_that_file() {
        let blobs = MemoryBlobStore::new();
        blobs.fail_put_containing("bad").await;

        let outcome = reconciler(&blobs)
            .reconcile(
                &scope(),
                Vec::new(),
                vec![
                    file("first.txt", b"1"),
                    file("bad.txt", b"2"),
                    file("third.txt", b"3"),
                ],
            )
            .await;

        let names: Vec<&str> = outcome
            .attachments
            .iter()
            .map(|a| a.filename.as_str())
            .collect();
        assert_eq!(names, vec!["first.txt", "third.txt"]);

        assert!(outcome.files[0].is_ok());
        assert!(matches!(
            outcome.files[1].result,
            Err(Error::BlobWrite { .. })
        ));
        assert!(outcome.files[2].is_ok());
        assert_eq!(outcome.failures().count(), 1);
    }

    #[tokio::test]
    async fn test_put_failure_during_replacement_keeps_old_entry() {
        let blobs = MemoryBlobStore::new();
        let current = seeded(&blobs, &["keep.txt"]).await;
        let old = current[0].clone();
        blobs.fail_put_containing("keep").await;

        let outcome = reconciler(&blobs)
            .reconcile(&scope(), current, vec![file("keep.txt", b"v2")])
            .await;

        // The new version never made it; the sequence still carries the old
        // entry, whose blob may already be gone under the delete-first
        // ordering.
        assert_eq!(outcome.attachments.len(), 1);
        assert_eq!(outcome.attachments[0].id, old.id);
        assert!(outcome.has_failures());
    }

    #[tokio::test]
    async fn test_duplicate_names_within_one_batch_collapse() {
        let blobs = MemoryBlobStore::new();
        let outcome = reconciler(&blobs)
            .reconcile(
                &scope(),
                Vec::new(),
                vec![file("twice.txt", b"first"), file("twice.txt", b"second")],
            )
            .await;

        // The second occurrence replaces the first: one entry, latest bytes.
        assert_eq!(outcome.attachments.len(), 1);
        assert!(matches!(
            outcome.files[0].result,
            Ok(FileDisposition::Appended)
        ));
        assert!(matches!(
            outcome.files[1].result,
            Ok(FileDisposition::Replaced)
        ));
        let stored = blobs
            .get(&outcome.attachments[0].storage_path)
            .await
            .expect("latest blob present");
        assert_eq!(stored.data, b"second");
        assert_eq!(blobs.object_count().await, 1);
    }

    #[tokio::test]
    async fn test_output_length_property() {
        // length = unmatched current + distinct incoming names
        let blobs = MemoryBlobStore::new();
        let current = seeded(&blobs, &["a", "b", "c"]).await;

        let outcome = reconciler(&blobs)
            .reconcile(
                &scope(),
                current,
                vec![file("b", b"x"), file("d", b"y"), file("e", b"z")],
            )
            .await;

        // unmatched current: a, c (2) + distinct incoming: b, d, e (3)
        assert_eq!(outcome.attachments.len(), 5);
        let names: Vec<&str> = outcome
            .attachments
            .iter()
            .map(|a| a.filename.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_filename_match_is_case_sensitive() {
        let blobs = MemoryBlobStore::new();
        let current = seeded(&blobs, &["Report.pdf"]).await;

        let outcome = reconciler(&blobs)
            .reconcile(&scope(), current, vec![file("report.pdf", b"x")])
            .await;

        // Different byte sequence → append, not replace.
        assert_eq!(outcome.attachments.len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_before_store_io() {
        let blobs = MemoryBlobStore::new();
        let outcome = AttachmentReconciler::new(Arc::new(blobs.clone()))
            .with_max_upload_bytes(4)
            .reconcile(&scope(), Vec::new(), vec![file("huge.bin", b"12345")])
            .await;

        assert!(outcome.attachments.is_empty());
        assert!(matches!(
            outcome.files[0].result,
            Err(Error::InvalidInput(_))
        ));
        // Rejected before any storage call.
        assert!(blobs.journal().await.is_empty());
    }

    #[tokio::test]
    async fn test_storage_paths_are_scoped_and_sanitized() {
        let blobs = MemoryBlobStore::new();
        let outcome = reconciler(&blobs)
            .reconcile(
                &ScopeId::new("tenant-9"),
                Vec::new(),
                vec![file("../..//evil?.txt", b"x")],
            )
            .await;

        let path = &outcome.attachments[0].storage_path;
        assert!(path.starts_with("media/tenant-9/"));
        assert!(!path.contains(".."));
        assert!(!path.contains('?'));
        // Original name survives as logical identity.
        assert_eq!(outcome.attachments[0].filename, "../..//evil?.txt");
    }

    #[tokio::test]
    async fn test_content_type_corrected_from_magic_bytes() {
        let blobs = MemoryBlobStore::new();
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let outcome = reconciler(&blobs)
            .reconcile(
                &scope(),
                Vec::new(),
                vec![IncomingFile::new("shot.png", "text/plain", png.to_vec())],
            )
            .await;

        assert_eq!(outcome.attachments[0].content_type, "image/png");
    }
}
