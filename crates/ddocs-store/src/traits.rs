use async_trait::async_trait;
use ddocs_types::{EntityId, EntityKind};
use serde_json::Value as JsonValue;

use crate::error::StoreResult;

/// Storage gateway for addressable entities.
///
/// All implementations must satisfy these invariants:
/// - `create` succeeds at most once per id. Later calls fail with
///   `AlreadyInitialized`.
/// - Operations addressed to one entity are applied in the order received.
/// - `get` returns `Ok(None)` only for an entity that was never created and
///   never written to; a created entity without content reads as `{}`.
/// - `replace` and `merge` on a never-created entity store the content but do
///   not mark the entity created.
/// - Errors are returned unchanged; the gateway never retries.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Allocate a fresh, globally unique entity id. Does not create anything.
    fn new_unique_id(&self) -> EntityId;

    /// Initialize an entity of the given kind, optionally with content.
    async fn create(
        &self,
        id: &EntityId,
        kind: EntityKind,
        payload: Option<JsonValue>,
    ) -> StoreResult<()>;

    /// Read the stored content of an entity.
    async fn get(&self, id: &EntityId) -> StoreResult<Option<JsonValue>>;

    /// Overwrite the stored content of an entity.
    async fn replace(&self, id: &EntityId, content: JsonValue) -> StoreResult<()>;

    /// Deep-merge `content` into the stored content of an entity.
    async fn merge(&self, id: &EntityId, content: JsonValue) -> StoreResult<()>;

    /// Erase an entity. Returns `true` if anything was stored for it.
    async fn delete(&self, id: &EntityId) -> StoreResult<bool>;

    /// The kind an entity was created as, if it was created.
    async fn kind(&self, id: &EntityId) -> StoreResult<Option<EntityKind>>;
}
