use std::sync::Arc;

use ddocs_core::{Content, DocsConfig, DocsResult, Document, List, StorageHandle};
use ddocs_store::{EntityStore, InMemoryEntityStore};
use ddocs_types::{EntityId, ObjectId};
use tracing::debug;

/// Document store over a storage gateway.
#[derive(Clone, Debug)]
pub struct DurableDocs {
    handle: StorageHandle,
}

impl DurableDocs {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            handle: StorageHandle::new(store),
        }
    }

    pub fn with_config(store: Arc<dyn EntityStore>, config: DocsConfig) -> Self {
        Self {
            handle: StorageHandle::with_config(store, config),
        }
    }

    /// A store backed by a fresh [`InMemoryEntityStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryEntityStore::new()))
    }

    pub fn handle(&self) -> &StorageHandle {
        &self.handle
    }

    pub fn config(&self) -> &DocsConfig {
        self.handle.config()
    }

    /// Create and store a new document.
    pub async fn create(&self, content: Content) -> DocsResult<Document> {
        let mut document = Document::new(&self.handle);
        document.init(&content).await?;
        debug!(id = %document.id(), "document created");
        Ok(document)
    }

    /// Fetch the document at `id`.
    ///
    /// With the default configuration an id that was never created yields a
    /// new empty document.
    pub async fn get(&self, id: impl Into<EntityId>) -> DocsResult<Document> {
        let mut document = Document::with_id(&self.handle, id.into());
        document.load().await?;
        Ok(document)
    }

    /// Placeholder for a list field in new content.
    pub fn list(&self) -> List {
        List::new(&self.handle)
    }

    /// Handle to an existing list.
    pub fn list_with_id(&self, id: impl Into<EntityId>) -> List {
        List::with_id(&self.handle, id.into())
    }

    /// Unset reference token.
    pub fn object_id(&self) -> ObjectId {
        ObjectId::unset()
    }

    /// Reference token pointing at `id`.
    pub fn object_id_of(&self, id: impl Into<EntityId>) -> ObjectId {
        ObjectId::new(id)
    }
}
