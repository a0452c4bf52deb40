//! Ordered, deduplicated lists of document ids.
//!
//! A list is its own entity. The document that owns it (if any) is recorded
//! as `parent_document_id`; documents added through [`List::add_doc`] get that
//! id appended to their own parent list, which is what orphan cleanup in
//! [`List::clear_delete`] counts.
//!
//! Every mutation is read-then-replace of the whole id sequence. Two writers
//! racing on the same list lose updates: the later write wins.

use std::collections::VecDeque;

use ddocs_store::StoreError;
use ddocs_types::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::Document;
use crate::error::{DocsError, DocsResult};
use crate::handle::{EntityState, StorageHandle};
use crate::value::Value;

/// Stored form of a list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct ListRecord {
    #[serde(default)]
    ids: Vec<EntityId>,
}

/// Read the current id sequence of a list entity. Missing entities read as
/// empty.
async fn read_ids(handle: &StorageHandle, id: &EntityId) -> DocsResult<Vec<EntityId>> {
    let Some(content) = handle.store().get(id).await? else {
        return Ok(Vec::new());
    };
    let record: ListRecord =
        serde_json::from_value(content).map_err(|e| DocsError::MalformedRecord {
            id: id.clone(),
            reason: e.to_string(),
        })?;
    Ok(record.ids)
}

/// Handle to a list entity.
#[derive(Clone, Debug)]
pub struct List {
    id: EntityId,
    handle: StorageHandle,
    state: EntityState,
    parent_document_id: Option<EntityId>,
    /// Set once this handle has issued (or lost the race for) the create call.
    created: bool,
}

impl List {
    /// A new list. The id is allocated now; the backend record is created on
    /// the first mutation.
    pub fn new(handle: &StorageHandle) -> Self {
        Self {
            id: handle.new_id(),
            handle: handle.clone(),
            state: EntityState::Unbound,
            parent_document_id: None,
            created: false,
        }
    }

    /// Bind to an existing list without fetching it.
    pub fn with_id(handle: &StorageHandle, id: EntityId) -> Self {
        Self {
            id,
            handle: handle.clone(),
            state: EntityState::Bound,
            parent_document_id: None,
            created: false,
        }
    }

    /// Attach the document that owns this list.
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent_document_id = Some(parent);
        self
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub fn parent_document_id(&self) -> Option<&EntityId> {
        self.parent_document_id.as_ref()
    }

    pub fn set_parent_document_id(&mut self, parent: Option<EntityId>) {
        self.parent_document_id = parent;
    }

    fn check_live(&self) -> DocsResult<()> {
        if self.state == EntityState::Deleted {
            return Err(DocsError::NotBound {
                id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Create the backend record if this handle has not done so yet.
    ///
    /// A fresh list starts as `{"ids": []}`. A handle bound to an existing id
    /// creates without a payload so stored ids are kept.
    pub(crate) async fn ensure_initialized(&mut self) -> DocsResult<()> {
        self.check_live()?;
        if self.created {
            return Ok(());
        }
        let payload = match self.state {
            EntityState::Unbound => Some(
                serde_json::to_value(ListRecord::default())
                    .map_err(|e| StoreError::Serialization(e.to_string()))?,
            ),
            _ => None,
        };
        match self
            .handle
            .store()
            .create(&self.id, EntityKind::List, payload)
            .await
        {
            Ok(()) => debug!(id = %self.id, "list created"),
            // Already created, by another handle or before this one was bound.
            Err(StoreError::AlreadyInitialized(_)) => {}
            Err(e) => return Err(e.into()),
        }
        self.state = EntityState::Bound;
        self.created = true;
        Ok(())
    }

    async fn write_ids(&mut self, ids: Vec<EntityId>) -> DocsResult<()> {
        self.ensure_initialized().await?;
        let count = ids.len();
        let content = serde_json::to_value(ListRecord { ids })
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.handle.store().replace(&self.id, content).await?;
        debug!(id = %self.id, count, "list ids written");
        Ok(())
    }

    /// Current ordered ids. Empty if the list was never written.
    pub async fn ids(&self) -> DocsResult<Vec<EntityId>> {
        self.check_live()?;
        read_ids(&self.handle, &self.id).await
    }

    pub async fn size(&self) -> DocsResult<usize> {
        Ok(self.ids().await?.len())
    }

    /// Lazily load each member document in list order.
    ///
    /// The id sequence is fetched on the first call to
    /// [`DocumentIter::next`]; every call to `documents` starts over.
    pub fn documents(&self) -> DocsResult<DocumentIter> {
        self.check_live()?;
        Ok(DocumentIter {
            handle: self.handle.clone(),
            list_id: self.id.clone(),
            pending: None,
        })
    }

    /// Append `id` unless it is already present.
    pub async fn add_id(&mut self, id: &EntityId) -> DocsResult<()> {
        if id.is_empty() {
            return Err(DocsError::InvalidArgument(
                "cannot add an empty id to a list".into(),
            ));
        }
        self.ensure_initialized().await?;
        let mut ids = read_ids(&self.handle, &self.id).await?;
        if ids.contains(id) {
            return Ok(());
        }
        ids.push(id.clone());
        self.write_ids(ids).await
    }

    /// Add a document, then record this list's owner in the document's
    /// parent list.
    ///
    /// The two writes are not atomic: if the second fails, the list refers to
    /// the document but the document has no back-reference.
    pub async fn add_doc(&mut self, document: &mut Document) -> DocsResult<()> {
        self.add_id(document.id()).await?;
        if !self.handle.config().track_parents {
            return Ok(());
        }
        if let Some(parent) = self.parent_document_id.clone() {
            let mut parents = document.parents().await?;
            parents.add_id(&parent).await?;
        }
        Ok(())
    }

    /// Remove `id` from the list. No-op if absent.
    pub async fn unlist_id(&mut self, id: &EntityId) -> DocsResult<()> {
        self.check_live()?;
        let ids = read_ids(&self.handle, &self.id).await?;
        if !ids.contains(id) {
            return Ok(());
        }
        let remaining: Vec<EntityId> = ids.into_iter().filter(|entry| entry != id).collect();
        self.write_ids(remaining).await
    }

    /// Unlink every member from this list's owner, then empty the list.
    /// Members are kept even if nothing references them anymore.
    pub async fn clear(&mut self) -> DocsResult<()> {
        self.check_live()?;
        let parent = self
            .parent_document_id
            .clone()
            .filter(|_| self.handle.config().track_parents);

        let mut members = self.documents()?;
        while let Some(document) = members.next().await {
            let mut document = document?;
            if let Some(parent) = &parent {
                document.parents().await?.unlist_id(parent).await?;
            }
        }

        if read_ids(&self.handle, &self.id).await?.is_empty() {
            return Ok(());
        }
        self.write_ids(Vec::new()).await
    }

    /// Empty the list, deleting members that it was the only reference to.
    ///
    /// A member whose parent list holds more than one id is only unlinked
    /// from this list's owner; any other member is deleted outright.
    pub async fn clear_delete(&mut self) -> DocsResult<()> {
        self.check_live()?;
        let parent = self.parent_document_id.clone();

        let mut members = self.documents()?;
        while let Some(document) = members.next().await {
            let mut document = document?;
            let mut parents = document.parents().await?;
            let references = parents.size().await?;
            if references > 1 {
                if let Some(parent) = &parent {
                    parents.unlist_id(parent).await?;
                } else {
                    warn!(
                        list = %self.id,
                        document = %document.id(),
                        "list has no owner; shared member left linked"
                    );
                }
            } else {
                debug!(list = %self.id, document = %document.id(), "deleting orphaned document");
                document.delete().await?;
            }
        }

        if read_ids(&self.handle, &self.id).await?.is_empty() {
            return Ok(());
        }
        self.write_ids(Vec::new()).await
    }

    /// Delete this list's record. Member documents are untouched.
    pub async fn delete(&mut self) -> DocsResult<()> {
        self.check_live()?;
        self.handle.store().delete(&self.id).await?;
        self.state = EntityState::Deleted;
        debug!(id = %self.id, "list deleted");
        Ok(())
    }
}

impl From<&List> for Value {
    fn from(list: &List) -> Self {
        Value::List(list.id.clone())
    }
}

/// Sequential loader over a list's members. See [`List::documents`].
#[derive(Debug)]
pub struct DocumentIter {
    handle: StorageHandle,
    list_id: EntityId,
    pending: Option<VecDeque<EntityId>>,
}

impl DocumentIter {
    /// Load the next member, or `None` once the sequence is exhausted.
    pub async fn next(&mut self) -> Option<DocsResult<Document>> {
        if self.pending.is_none() {
            match read_ids(&self.handle, &self.list_id).await {
                Ok(ids) => self.pending = Some(ids.into()),
                Err(e) => {
                    self.pending = Some(VecDeque::new());
                    return Some(Err(e));
                }
            }
        }
        let id = self.pending.as_mut()?.pop_front()?;
        let mut document = Document::with_id(&self.handle, id);
        Some(document.load().await.map(|()| document))
    }

    /// Load every remaining member, stopping at the first error.
    pub async fn collect(mut self) -> DocsResult<Vec<Document>> {
        let mut documents = Vec::new();
        while let Some(document) = self.next().await {
            documents.push(document?);
        }
        Ok(documents)
    }
}
