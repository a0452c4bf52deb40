//! Foundation types for DurableDocs.
//!
//! Every other DurableDocs crate depends on `ddocs-types`. The types here carry
//! no storage behavior of their own; they only name things.
//!
//! # Key Types
//!
//! - [`EntityId`] — Opaque, globally unique identifier of a stored entity
//! - [`ObjectId`] — Reference token: a possibly-unset pointer to a document
//! - [`EntityKind`] — Whether an entity holds a document or a list

pub mod error;
pub mod id;
pub mod kind;

pub use error::TypeError;
pub use id::{EntityId, ObjectId};
pub use kind::EntityKind;
