//! Reference-tracking document layer for DurableDocs.
//!
//! Documents, ordered lists of document ids, and reference tokens, stored one
//! entity each through a [`ddocs_store::EntityStore`]. Only ids are ever
//! persisted in place of references; the [`codec`] records where they sit so
//! live handles can be rebuilt on read.
//!
//! # Modules
//!
//! - [`value`] — Live content trees ([`Value`], [`Content`])
//! - [`codec`] — [`flatten`] and [`rehydrate`]
//! - [`reftree`] — [`RefTree`] of rebuilt handles
//! - [`list`] — [`List`] membership and orphan cleanup
//! - [`document`] — [`Document`] content and parent tracking
//! - [`config`] — [`DocsConfig`]
//! - [`error`] — [`DocsError`] and [`CodecError`]
//!
//! # Ownership
//!
//! Each document owns a parent list holding the ids of the documents whose
//! lists contain it. A document whose parent list is empty is an orphan;
//! [`List::clear_delete`] deletes members that it leaves orphaned.

pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod handle;
pub mod list;
pub mod reftree;
pub mod value;

#[cfg(test)]
pub(crate) mod test_support;

pub use codec::{flatten, merge_ref_keys, rehydrate, ContentRefDef, RefKeys};
pub use config::DocsConfig;
pub use document::Document;
pub use error::{CodecError, DocsError, DocsResult};
pub use handle::{EntityState, StorageHandle};
pub use list::{DocumentIter, List};
pub use reftree::{RefNode, RefTree};
pub use value::{Content, Value};
