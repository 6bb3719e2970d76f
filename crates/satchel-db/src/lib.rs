//! # satchel-db
//!
//! Reference backends for the satchel collaborator traits:
//!
//! - [`postgres::PgRecordStore`]: owner-scoped note records in PostgreSQL
//! - [`fs::FsBlobStore`]: attachment bytes on the local filesystem
//! - [`memory`]: in-memory record/blob/audit/auth implementations with
//!   operation journals, used by tests across the workspace
//!
//! Hosted deployments typically implement [`satchel_core::RecordStore`] and
//! [`satchel_core::BlobStore`] over their managed document and object
//! stores; these backends cover local use and testing.

pub mod fs;
pub mod memory;
pub mod postgres;

pub use fs::FsBlobStore;
pub use memory::{
    BlobOp, MemoryAuditSink, MemoryBlobStore, MemoryRecordStore, MemoryRecords,
    StaticAuthProvider, StoredBlob,
};
pub use postgres::{PgRecordProvider, PgRecordStore};
