use std::fmt;
use std::sync::Arc;

use ddocs_store::EntityStore;
use ddocs_types::EntityId;

use crate::config::DocsConfig;

/// Binding state of a document or list handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityState {
    /// An id is allocated but no backend record has been created through
    /// this handle.
    Unbound,
    /// A backend record exists (or is assumed to, for handles bound by id).
    Bound,
    /// The record was deleted through this handle. Terminal.
    Deleted,
}

/// Shared access to the storage gateway plus the layer's configuration.
///
/// Cheap to clone; every document and list handle carries one.
#[derive(Clone)]
pub struct StorageHandle {
    store: Arc<dyn EntityStore>,
    config: Arc<DocsConfig>,
}

impl StorageHandle {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self::with_config(store, DocsConfig::default())
    }

    pub fn with_config(store: Arc<dyn EntityStore>, config: DocsConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &DocsConfig {
        &self.config
    }

    /// Allocate a fresh entity id from the gateway.
    pub fn new_id(&self) -> EntityId {
        self.store.new_unique_id()
    }
}

impl fmt::Debug for StorageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageHandle")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
