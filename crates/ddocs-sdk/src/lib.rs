//! High-level SDK for DurableDocs.
//!
//! Provides a single entry point for applications embedding the document
//! layer: create and fetch documents, and build the list and reference-token
//! placeholders used inside new content.

pub mod docs;

pub use docs::DurableDocs;

// Re-export key types
pub use ddocs_core::{
    Content, DocsConfig, DocsError, DocsResult, Document, DocumentIter, EntityState, List,
    RefNode, RefTree, StorageHandle, Value,
};
pub use ddocs_store::{EntityStore, InMemoryEntityStore};
pub use ddocs_types::{EntityId, EntityKind, ObjectId};
