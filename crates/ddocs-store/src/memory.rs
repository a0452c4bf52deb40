use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use ddocs_types::{EntityId, EntityKind};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, trace};

use crate::error::{StoreError, StoreResult};
use crate::merge::deep_merge;
use crate::traits::EntityStore;

/// Everything stored for a single entity.
#[derive(Clone, Debug, Default)]
struct Slot {
    /// Set by `create`. `None` means the entity was never initialized, even
    /// if content has been written to it.
    kind: Option<EntityKind>,
    data: Option<JsonValue>,
}

/// In-memory, HashMap-based entity store.
///
/// Intended for tests and embedding. All entities are held in memory behind a
/// `RwLock`; the lock is never held across an await point, so every
/// operation is applied atomically per entity.
pub struct InMemoryEntityStore {
    entities: RwLock<HashMap<EntityId, Slot>>,
}

impl Slot {
    /// Stored content; a created entity with nothing written reads as `{}`.
    fn content(&self) -> Option<JsonValue> {
        match (&self.data, self.kind) {
            (Some(data), _) => Some(data.clone()),
            (None, Some(_)) => Some(JsonValue::Object(Map::new())),
            (None, None) => None,
        }
    }
}

impl InMemoryEntityStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entities with anything stored.
    pub fn len(&self) -> usize {
        self.entities.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether anything is stored for `id`.
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities
            .read()
            .map(|m| m.contains_key(id))
            .unwrap_or(false)
    }

    /// Return a sorted list of all stored entity ids.
    pub fn all_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .entities
            .read()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    fn read_map(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<EntityId, Slot>>> {
        self.entities
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn write_map(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<EntityId, Slot>>> {
        self.entities
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }
}

impl Default for InMemoryEntityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    fn new_unique_id(&self) -> EntityId {
        EntityId::generate()
    }

    async fn create(
        &self,
        id: &EntityId,
        kind: EntityKind,
        payload: Option<JsonValue>,
    ) -> StoreResult<()> {
        let mut map = self.write_map()?;
        let slot = map.entry(id.clone()).or_default();
        if slot.kind.is_some() {
            return Err(StoreError::AlreadyInitialized(id.clone()));
        }
        slot.kind = Some(kind);
        if let Some(payload) = payload {
            slot.data = Some(payload);
        }
        debug!(id = %id, kind = %kind, "entity created");
        Ok(())
    }

    async fn get(&self, id: &EntityId) -> StoreResult<Option<JsonValue>> {
        let map = self.read_map()?;
        trace!(id = %id, "entity get");
        Ok(map.get(id).and_then(Slot::content))
    }

    async fn replace(&self, id: &EntityId, content: JsonValue) -> StoreResult<()> {
        let mut map = self.write_map()?;
        map.entry(id.clone()).or_default().data = Some(content);
        trace!(id = %id, "entity replaced");
        Ok(())
    }

    async fn merge(&self, id: &EntityId, content: JsonValue) -> StoreResult<()> {
        let mut map = self.write_map()?;
        let slot = map.entry(id.clone()).or_default();
        match slot.data.as_mut() {
            Some(existing) => deep_merge(existing, content),
            None => slot.data = Some(content),
        }
        trace!(id = %id, "entity merged");
        Ok(())
    }

    async fn delete(&self, id: &EntityId) -> StoreResult<bool> {
        let mut map = self.write_map()?;
        let existed = map.remove(id).is_some();
        debug!(id = %id, existed, "entity deleted");
        Ok(existed)
    }

    async fn kind(&self, id: &EntityId) -> StoreResult<Option<EntityKind>> {
        let map = self.read_map()?;
        Ok(map.get(id).and_then(|slot| slot.kind))
    }
}

impl std::fmt::Debug for InMemoryEntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEntityStore")
            .field("entity_count", &self.len())
            .finish()
    }
}
