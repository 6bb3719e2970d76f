//! # satchel-client
//!
//! The satchel client core: the attachment reconciler, the note service,
//! and the note collection view-model.
//!
//! All storage and auth concerns are behind the `satchel-core` collaborator
//! traits; see `satchel-db` for the reference backends.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use satchel_client::NoteCollection;
//! use satchel_core::{IncomingFile, NoteFields, ScopeId};
//! use satchel_db::{MemoryAuditSink, MemoryBlobStore, MemoryRecords, StaticAuthProvider};
//!
//! let mut notes = NoteCollection::new(
//!     Arc::new(StaticAuthProvider::signed_in(ScopeId::new("me"))),
//!     Arc::new(MemoryRecords::new()),
//!     Arc::new(MemoryBlobStore::new()),
//!     Arc::new(MemoryAuditSink::new()),
//! );
//!
//! notes
//!     .create(
//!         NoteFields { name: "trip".into(), description: "packing list".into() },
//!         vec![IncomingFile::new("list.txt", "text/plain", b"socks".to_vec())],
//!     )
//!     .await?;
//! ```

pub mod collection;
pub mod reconcile;
pub mod service;

pub use collection::{AttachmentView, NoteCollection, NoteView};
pub use reconcile::{AttachmentReconciler, FileDisposition, FileOutcome, ReconcileOutcome};
pub use service::{NoteService, NoteWriteResult};
