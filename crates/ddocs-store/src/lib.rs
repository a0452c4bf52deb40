//! Per-entity storage gateway for DurableDocs.
//!
//! Every document and list lives in its own addressable entity. This crate
//! defines the narrow contract those entities expose and ships an in-memory
//! backend. The document layer above never touches storage any other way.
//!
//! # Contract
//!
//! | Operation | Behavior |
//! |-----------|----------|
//! | create    | Initializes the entity exactly once; repeats fail with `AlreadyInitialized`. |
//! | get       | Returns stored content (`{}` for a created entity with none), or `None` if the entity was never created. |
//! | replace   | Full overwrite of stored content. |
//! | merge     | Deep merge: objects merge key by key, arrays and scalars overwrite. |
//! | delete    | Erases everything stored for the entity. |
//!
//! # Backends
//!
//! All backends implement the [`EntityStore`] trait:
//!
//! - [`InMemoryEntityStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Each entity serializes the operations addressed to it.
//! 2. There are no cross-entity transactions.
//! 3. The store never interprets content beyond the deep-merge rule.
//! 4. Failures are propagated to the caller, never retried here.

pub mod error;
pub mod memory;
pub mod merge;
pub mod request;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryEntityStore;
pub use merge::deep_merge;
pub use request::{dispatch, EntityRequest, EntityResponse};
pub use traits::EntityStore;
