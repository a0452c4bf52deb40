//! Stores and helpers shared by the unit tests in this crate.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ddocs_store::{EntityStore, InMemoryEntityStore, StoreError, StoreResult};
use ddocs_types::{EntityId, EntityKind};
use serde_json::Value as JsonValue;

use crate::config::DocsConfig;
use crate::handle::StorageHandle;

pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub(crate) fn memory_handle() -> StorageHandle {
    memory_store().1
}

pub(crate) fn memory_store() -> (Arc<InMemoryEntityStore>, StorageHandle) {
    init_test_tracing();
    let store = Arc::new(InMemoryEntityStore::new());
    let handle = StorageHandle::new(store.clone());
    (store, handle)
}

pub(crate) fn memory_store_with(config: DocsConfig) -> (Arc<InMemoryEntityStore>, StorageHandle) {
    init_test_tracing();
    let store = Arc::new(InMemoryEntityStore::new());
    let handle = StorageHandle::with_config(store.clone(), config);
    (store, handle)
}

/// Fails create/replace/merge calls addressed to selected entities.
pub(crate) struct FailingStore {
    inner: InMemoryEntityStore,
    fail_writes_to: Mutex<HashSet<EntityId>>,
}

impl FailingStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryEntityStore::new(),
            fail_writes_to: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn fail_writes_to(&self, id: &EntityId) {
        self.fail_writes_to.lock().unwrap().insert(id.clone());
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }

    fn check(&self, id: &EntityId) -> StoreResult<()> {
        if self.fail_writes_to.lock().unwrap().contains(id) {
            return Err(StoreError::Backend(format!("injected write failure for {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for FailingStore {
    fn new_unique_id(&self) -> EntityId {
        self.inner.new_unique_id()
    }

    async fn create(
        &self,
        id: &EntityId,
        kind: EntityKind,
        payload: Option<JsonValue>,
    ) -> StoreResult<()> {
        self.check(id)?;
        self.inner.create(id, kind, payload).await
    }

    async fn get(&self, id: &EntityId) -> StoreResult<Option<JsonValue>> {
        self.inner.get(id).await
    }

    async fn replace(&self, id: &EntityId, content: JsonValue) -> StoreResult<()> {
        self.check(id)?;
        self.inner.replace(id, content).await
    }

    async fn merge(&self, id: &EntityId, content: JsonValue) -> StoreResult<()> {
        self.check(id)?;
        self.inner.merge(id, content).await
    }

    async fn delete(&self, id: &EntityId) -> StoreResult<bool> {
        self.inner.delete(id).await
    }

    async fn kind(&self, id: &EntityId) -> StoreResult<Option<EntityKind>> {
        self.inner.kind(id).await
    }
}

/// Yields to the executor after every read, so that two mutators polled
/// together both read before either writes.
pub(crate) struct YieldingStore {
    inner: InMemoryEntityStore,
}

impl YieldingStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryEntityStore::new(),
        }
    }
}

#[async_trait]
impl EntityStore for YieldingStore {
    fn new_unique_id(&self) -> EntityId {
        self.inner.new_unique_id()
    }

    async fn create(
        &self,
        id: &EntityId,
        kind: EntityKind,
        payload: Option<JsonValue>,
    ) -> StoreResult<()> {
        self.inner.create(id, kind, payload).await
    }

    async fn get(&self, id: &EntityId) -> StoreResult<Option<JsonValue>> {
        let content = self.inner.get(id).await;
        tokio::task::yield_now().await;
        content
    }

    async fn replace(&self, id: &EntityId, content: JsonValue) -> StoreResult<()> {
        self.inner.replace(id, content).await
    }

    async fn merge(&self, id: &EntityId, content: JsonValue) -> StoreResult<()> {
        self.inner.merge(id, content).await
    }

    async fn delete(&self, id: &EntityId) -> StoreResult<bool> {
        self.inner.delete(id).await
    }

    async fn kind(&self, id: &EntityId) -> StoreResult<Option<EntityKind>> {
        self.inner.kind(id).await
    }
}
