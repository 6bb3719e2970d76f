//! # satchel-core
//!
//! Core types, traits, and abstractions for the satchel note keeper.
//!
//! This crate provides the data model (notes, attachments, manifests), the
//! collaborator traits (auth provider, record store, blob store, audit
//! sink), the filename sanitizer, and the shared error type that the other
//! satchel crates depend on.

pub mod defaults;
pub mod error;
pub mod events;
pub mod file_safety;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{SessionBus, SessionEvent};
pub use file_safety::{detect_content_type, sanitize_filename, validate_upload};
pub use models::*;
pub use traits::*;
