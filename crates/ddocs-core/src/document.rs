//! Addressable documents with tracked references.
//!
//! A document caches its last-loaded data, the reference paths recorded with
//! it, the [`RefTree`] rebuilt from those paths, and its parent list. All four
//! are replaced together on every load, so they never disagree with each
//! other (though they may lag behind the store).

use ddocs_store::StoreError;
use ddocs_types::{EntityId, EntityKind};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use crate::codec::{flatten, merge_ref_keys, rehydrate, resolve_mut, ContentRefDef, RefKeys};
use crate::error::{DocsError, DocsResult};
use crate::handle::{EntityState, StorageHandle};
use crate::list::List;
use crate::reftree::RefTree;
use crate::value::{Content, Value};

/// Handle to a document entity.
#[derive(Clone, Debug)]
pub struct Document {
    id: EntityId,
    handle: StorageHandle,
    state: EntityState,
    local_data: Map<String, JsonValue>,
    metadata: RefKeys,
    refs: RefTree,
    parent_list: Option<List>,
}

impl Document {
    /// A new document. The id is allocated now; nothing is stored until
    /// [`Document::init`].
    pub fn new(handle: &StorageHandle) -> Self {
        Self::with_state(handle, handle.new_id(), EntityState::Unbound)
    }

    /// Bind to an existing document without fetching it.
    pub fn with_id(handle: &StorageHandle, id: EntityId) -> Self {
        Self::with_state(handle, id, EntityState::Bound)
    }

    fn with_state(handle: &StorageHandle, id: EntityId, state: EntityState) -> Self {
        Self {
            id,
            handle: handle.clone(),
            state,
            local_data: Map::new(),
            metadata: RefKeys::default(),
            refs: RefTree::new(),
            parent_list: None,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    /// Reference paths from the last load.
    pub fn metadata(&self) -> &RefKeys {
        &self.metadata
    }

    /// Reference handles from the last load.
    pub fn refs(&self) -> &RefTree {
        &self.refs
    }

    pub fn refs_mut(&mut self) -> &mut RefTree {
        &mut self.refs
    }

    fn not_bound(&self) -> DocsError {
        DocsError::NotBound {
            id: self.id.clone(),
        }
    }

    fn check_live(&self) -> DocsResult<()> {
        match self.state {
            EntityState::Deleted => Err(self.not_bound()),
            _ => Ok(()),
        }
    }

    fn check_bound(&self) -> DocsResult<()> {
        match self.state {
            EntityState::Bound => Ok(()),
            _ => Err(self.not_bound()),
        }
    }

    async fn fetch_record(&self) -> DocsResult<Option<ContentRefDef>> {
        let Some(content) = self.handle.store().get(&self.id).await? else {
            return Ok(None);
        };
        let record = serde_json::from_value(content).map_err(|e| DocsError::MalformedRecord {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(record))
    }

    /// Replace every cached field from one stored record.
    fn apply(&mut self, record: ContentRefDef) -> DocsResult<()> {
        let refs = rehydrate(&record.data, &record.refs, &self.handle, Some(&self.id))?;
        self.local_data = record.data;
        self.metadata = record.refs;
        self.refs = refs;
        self.parent_list = record
            .parent_list_id
            .map(|id| List::with_id(&self.handle, id));
        self.state = EntityState::Bound;
        Ok(())
    }

    fn encode(record: &ContentRefDef) -> DocsResult<JsonValue> {
        serde_json::to_value(record)
            .map_err(|e| StoreError::Serialization(e.to_string()).into())
    }

    /// Create the document with `content` and a fresh parent list.
    ///
    /// Fails with `AlreadyInitialized` if the record already exists.
    pub async fn init(&mut self, content: &Content) -> DocsResult<()> {
        self.check_live()?;
        let mut record = flatten(content, "")?;

        let mut parent_list = List::new(&self.handle);
        parent_list.ensure_initialized().await?;
        record.parent_list_id = Some(parent_list.id().clone());

        let payload = Self::encode(&record)?;
        match self
            .handle
            .store()
            .create(&self.id, EntityKind::Document, Some(payload))
            .await
        {
            Ok(()) => {}
            Err(e) => {
                if let Err(discard) = parent_list.delete().await {
                    warn!(id = %parent_list.id(), error = %discard, "failed to discard unused parent list");
                }
                return Err(match e {
                    StoreError::AlreadyInitialized(id) => DocsError::AlreadyInitialized(id),
                    other => other.into(),
                });
            }
        }
        debug!(id = %self.id, parent_list = %parent_list.id(), "document initialized");

        let record = self
            .fetch_record()
            .await?
            .ok_or_else(|| DocsError::NotFound(self.id.clone()))?;
        self.apply(record)
    }

    /// Fetch the stored record and refresh every cached field.
    ///
    /// A document that was never created is created empty, unless
    /// `auto_create_on_load` is off, in which case this fails with `NotFound`.
    pub async fn load(&mut self) -> DocsResult<()> {
        self.check_live()?;
        match self.fetch_record().await? {
            Some(record) => self.apply(record),
            None if self.handle.config().auto_create_on_load => {
                debug!(id = %self.id, "document missing on load; creating it empty");
                self.init(&Content::new()).await
            }
            None => Err(DocsError::NotFound(self.id.clone())),
        }
    }

    async fn current_parent_list_id(&self) -> DocsResult<Option<EntityId>> {
        if let Some(list) = &self.parent_list {
            return Ok(Some(list.id().clone()));
        }
        Ok(self
            .fetch_record()
            .await?
            .and_then(|record| record.parent_list_id))
    }

    /// Replace the document's content. Keys not in `content` are dropped; the
    /// parent list is kept.
    pub async fn set(&mut self, content: &Content) -> DocsResult<()> {
        self.check_bound()?;
        let mut record = flatten(content, "")?;
        record.parent_list_id = self.current_parent_list_id().await?;
        self.handle
            .store()
            .replace(&self.id, Self::encode(&record)?)
            .await?;
        debug!(id = %self.id, "document set");
        self.load().await
    }

    /// Deep-merge `content` into the document.
    ///
    /// Nested objects merge key by key; arrays and scalars overwrite. Stored
    /// reference paths survive unless `content` overwrites them.
    pub async fn update(&mut self, content: &Content) -> DocsResult<()> {
        self.check_bound()?;
        let patch = flatten(content, "")?;
        let existing = self
            .fetch_record()
            .await?
            .map(|record| record.refs)
            .unwrap_or_default();
        let refs = merge_ref_keys(&existing, &patch.data, &patch.refs);

        let merged = ContentRefDef {
            data: patch.data,
            refs,
            parent_list_id: None,
        };
        self.handle
            .store()
            .merge(&self.id, Self::encode(&merged)?)
            .await?;
        debug!(id = %self.id, "document updated");
        self.load().await
    }

    /// Stored data with reference leaves left as raw ids, or `None` if the
    /// document has no keys.
    pub async fn raw_data(&mut self) -> DocsResult<Option<Map<String, JsonValue>>> {
        self.load().await?;
        if self.local_data.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.local_data.clone()))
    }

    /// Like [`Document::raw_data`], with every list id replaced by the array
    /// of its member ids.
    pub async fn data(&mut self) -> DocsResult<Option<Map<String, JsonValue>>> {
        self.load().await?;
        if self.local_data.is_empty() {
            return Ok(None);
        }

        let mut expanded = self.local_data.clone();
        for path in &self.metadata.list_keys {
            let slot = resolve_mut(&mut expanded, path)?;
            let ids = match &*slot {
                JsonValue::String(id) if !id.is_empty() => {
                    List::with_id(&self.handle, EntityId::new(id.as_str()))
                        .ids()
                        .await?
                }
                _ => Vec::new(),
            };
            *slot = JsonValue::Array(
                ids.into_iter()
                    .map(|id| JsonValue::String(id.into_string()))
                    .collect(),
            );
        }
        Ok(Some(expanded))
    }

    /// The list of ids of everything that references this document.
    ///
    /// Documents stored without a parent list get one created and recorded.
    pub async fn parents(&mut self) -> DocsResult<List> {
        self.load().await?;
        if let Some(list) = &self.parent_list {
            return Ok(list.clone());
        }

        let mut list = List::new(&self.handle);
        list.ensure_initialized().await?;
        self.handle
            .store()
            .merge(&self.id, serde_json::json!({ "parentListId": list.id() }))
            .await?;
        debug!(id = %self.id, parent_list = %list.id(), "attached missing parent list");
        self.parent_list = Some(list.clone());
        Ok(list)
    }

    /// Delete the parent list, then this document's record.
    ///
    /// Lists and documents referenced from this document are not touched.
    pub async fn delete(&mut self) -> DocsResult<()> {
        self.check_bound()?;
        let parent_list_id = self.current_parent_list_id().await?;
        if let Some(id) = parent_list_id {
            List::with_id(&self.handle, id).delete().await?;
        }
        self.handle.store().delete(&self.id).await?;

        self.state = EntityState::Deleted;
        self.local_data = Map::new();
        self.metadata = RefKeys::default();
        self.refs = RefTree::new();
        self.parent_list = None;
        debug!(id = %self.id, "document deleted");
        Ok(())
    }
}

impl From<&Document> for Value {
    fn from(document: &Document) -> Self {
        Value::Document(document.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddocs_store::EntityStore;
    use ddocs_types::ObjectId;
    use serde_json::json;

    use crate::config::DocsConfig;
    use crate::error::CodecError;
    use crate::test_support::{memory_handle, memory_store, memory_store_with, FailingStore};
    use std::sync::Arc;

    fn map(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    async fn created(handle: &StorageHandle, content: Content) -> Document {
        let mut document = Document::new(handle);
        document.init(&content).await.unwrap();
        document
    }

    // -----------------------------------------------------------------------
    // init / load
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn init_stores_record_and_parent_list() {
        let (store, handle) = memory_store();
        let document = created(&handle, Content::new().with("name", "x")).await;

        assert_eq!(document.state(), EntityState::Bound);
        let stored = store.get(document.id()).await.unwrap().unwrap();
        assert_eq!(stored["data"], json!({"name": "x"}));
        assert_eq!(stored["refs"], json!({"idKeys": [], "listKeys": []}));
        let parent_list_id = stored["parentListId"].as_str().unwrap();
        assert_eq!(
            store.kind(&EntityId::new(parent_list_id)).await.unwrap(),
            Some(EntityKind::List)
        );
    }

    #[tokio::test]
    async fn init_twice_fails_and_discards_the_spare_parent_list() {
        let (store, handle) = memory_store();
        let mut document = created(&handle, Content::new()).await;
        assert_eq!(store.len(), 2);

        let err = document.init(&Content::new()).await.unwrap_err();
        assert!(matches!(err, DocsError::AlreadyInitialized(ref id) if id == document.id()));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn load_of_uncreated_document_creates_it_empty() {
        let (store, handle) = memory_store();
        let id = EntityId::new("never-created");
        let mut document = Document::with_id(&handle, id.clone());

        document.load().await.unwrap();
        assert_eq!(store.kind(&id).await.unwrap(), Some(EntityKind::Document));
        assert!(document.data().await.unwrap().is_none());
        assert!(document.raw_data().await.unwrap().is_none());
        assert_eq!(store.get(&id).await.unwrap().unwrap()["data"], json!({}));
    }

    #[tokio::test]
    async fn load_of_document_created_without_payload_reads_empty() {
        let (store, handle) = memory_store();
        let id = EntityId::new("created-empty");
        store.create(&id, EntityKind::Document, None).await.unwrap();

        let mut document = Document::with_id(&handle, id.clone());
        document.load().await.unwrap();
        assert_eq!(document.state(), EntityState::Bound);
        assert!(document.data().await.unwrap().is_none());
        assert!(document.refs().is_empty());

        let parents = document.parents().await.unwrap();
        assert!(parents.ids().await.unwrap().is_empty());
        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored["parentListId"], json!(parents.id()));
    }

    #[tokio::test]
    async fn failed_create_discards_the_spare_parent_list() {
        let store = Arc::new(FailingStore::new());
        let handle = StorageHandle::new(store.clone());
        let mut document = Document::new(&handle);
        store.fail_writes_to(document.id());

        let err = document.init(&Content::new()).await.unwrap_err();
        assert!(matches!(err, DocsError::Store(StoreError::Backend(_))));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn init_with_dotted_reference_key_writes_nothing() {
        let (store, handle) = memory_store();
        let other = created(&handle, Content::new()).await;
        assert_eq!(store.len(), 2);

        let mut document = Document::new(&handle);
        let err = document
            .init(&Content::new().with("a.b", &other))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DocsError::Codec(CodecError::InvalidKey { ref key, .. }) if key == "a.b"
        ));
        assert_eq!(store.len(), 2);
        assert!(store.get(document.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_with_dotted_reference_key_is_rejected() {
        let (store, handle) = memory_store();
        let mut document = created(&handle, Content::new().with("name", "x")).await;
        let before = store.get(document.id()).await.unwrap();

        let err = document
            .update(&Content::new().with("x.y", Value::List(EntityId::new("L"))))
            .await
            .unwrap_err();
        assert!(matches!(err, DocsError::Codec(CodecError::InvalidKey { .. })));
        assert_eq!(store.get(document.id()).await.unwrap(), before);
        document.load().await.unwrap();
    }

    #[tokio::test]
    async fn strict_load_of_uncreated_document_fails() {
        let (store, handle) = memory_store_with(DocsConfig::strict());
        let mut document = Document::with_id(&handle, EntityId::new("missing"));

        let err = document.load().await.unwrap_err();
        assert!(matches!(err, DocsError::NotFound(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn load_fails_fast_on_malformed_metadata() {
        let (store, handle) = memory_store();
        let id = EntityId::new("bad");
        store
            .create(
                &id,
                EntityKind::Document,
                Some(json!({
                    "data": {"present": "L1"},
                    "refs": {"idKeys": [], "listKeys": ["present", "absent.path"]},
                })),
            )
            .await
            .unwrap();

        let mut document = Document::with_id(&handle, id);
        let err = document.load().await.unwrap_err();
        assert!(matches!(
            err,
            DocsError::Codec(CodecError::MissingPath { ref path }) if path == "absent.path"
        ));
        assert!(document.refs().is_empty());
    }

    #[tokio::test]
    async fn load_rejects_records_of_the_wrong_shape() {
        let (store, handle) = memory_store();
        let id = EntityId::new("weird");
        store.replace(&id, json!({"data": [1, 2]})).await.unwrap();

        let mut document = Document::with_id(&handle, id);
        let err = document.load().await.unwrap_err();
        assert!(matches!(err, DocsError::MalformedRecord { .. }));
    }

    // -----------------------------------------------------------------------
    // Reference tree
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn refs_are_rebuilt_from_metadata() {
        let handle = memory_handle();
        let author = created(&handle, Content::new().with("username", "u")).await;
        let replies = List::new(&handle);
        let post = created(
            &handle,
            Content::new()
                .with("name", "post")
                .with("replies", &replies)
                .with("anonymous", ObjectId::unset())
                .with("meta", Content::new().with("author", &author)),
        )
        .await;

        assert_eq!(post.metadata().list_keys, vec!["replies"]);
        assert_eq!(post.metadata().id_keys, vec!["anonymous", "meta.author"]);
        assert_eq!(post.refs().paths(), vec!["meta.author", "replies"]);

        let list = post.refs().list("replies").unwrap();
        assert_eq!(list.id(), replies.id());
        assert_eq!(list.parent_document_id(), Some(post.id()));

        let mut linked = post.refs().document("meta.author").unwrap().clone();
        let data = linked.data().await.unwrap().unwrap();
        assert_eq!(data["username"], json!("u"));
    }

    #[tokio::test]
    async fn cyclic_references_load_without_recursing() {
        let handle = memory_handle();
        let mut a = created(&handle, Content::new()).await;
        let b = created(&handle, Content::new().with("peer", &a)).await;
        a.update(&Content::new().with("peer", &b)).await.unwrap();

        let mut peer = a.refs().document("peer").unwrap().clone();
        peer.load().await.unwrap();
        assert_eq!(peer.refs().document("peer").unwrap().id(), a.id());
    }

    // -----------------------------------------------------------------------
    // set / update
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn set_replaces_content_and_keeps_parent_list() {
        let (store, handle) = memory_store();
        let mut document = created(&handle, Content::new().with("a", 1i64).with("b", 2i64)).await;
        let parents_before = document.parents().await.unwrap();

        document.set(&Content::new().with("c", 3i64)).await.unwrap();

        assert_eq!(document.raw_data().await.unwrap(), Some(map(json!({"c": 3}))));
        let stored = store.get(document.id()).await.unwrap().unwrap();
        assert_eq!(stored["parentListId"], json!(parents_before.id().as_str()));
    }

    #[tokio::test]
    async fn set_clears_reference_metadata() {
        let handle = memory_handle();
        let list = List::new(&handle);
        let mut document = created(&handle, Content::new().with("items", &list)).await;

        document.set(&Content::new().with("items", "gone")).await.unwrap();
        assert!(document.metadata().list_keys.is_empty());
        assert!(document.refs().is_empty());
    }

    #[tokio::test]
    async fn update_merges_nested_objects_and_keeps_references() {
        let handle = memory_handle();
        let list = List::new(&handle);
        let mut document = created(
            &handle,
            Content::new()
                .with("items", &list)
                .with("meta", Content::new().with("a", 1i64))
                .with("tags", serde_json::json!(["x", "y"])),
        )
        .await;

        document
            .update(
                &Content::new()
                    .with("meta", Content::new().with("b", 2i64))
                    .with("tags", serde_json::json!(["z"])),
            )
            .await
            .unwrap();

        let raw = document.raw_data().await.unwrap().unwrap();
        assert_eq!(raw["meta"], json!({"a": 1, "b": 2}));
        assert_eq!(raw["tags"], json!(["z"]));
        assert_eq!(raw["items"], json!(list.id().as_str()));
        assert_eq!(document.metadata().list_keys, vec!["items"]);
        assert!(document.refs().list("items").is_some());
    }

    #[tokio::test]
    async fn update_overwriting_a_reference_drops_its_path() {
        let handle = memory_handle();
        let other = created(&handle, Content::new()).await;
        let mut document = created(&handle, Content::new().with("link", &other)).await;

        document.update(&Content::new().with("link", 5i64)).await.unwrap();
        assert!(document.metadata().id_keys.is_empty());
        assert!(document.refs().get("link").is_none());
        assert_eq!(document.raw_data().await.unwrap().unwrap()["link"], json!(5));
    }

    #[tokio::test]
    async fn writes_on_unbound_or_deleted_documents_fail() {
        let handle = memory_handle();
        let mut fresh = Document::new(&handle);
        assert!(matches!(
            fresh.set(&Content::new()).await,
            Err(DocsError::NotBound { .. })
        ));
        assert!(matches!(
            fresh.update(&Content::new()).await,
            Err(DocsError::NotBound { .. })
        ));
        assert!(matches!(fresh.delete().await, Err(DocsError::NotBound { .. })));

        let mut document = created(&handle, Content::new()).await;
        document.delete().await.unwrap();
        assert!(matches!(document.load().await, Err(DocsError::NotBound { .. })));
        assert!(matches!(document.data().await, Err(DocsError::NotBound { .. })));
        assert!(matches!(document.parents().await, Err(DocsError::NotBound { .. })));
        assert!(matches!(
            document.init(&Content::new()).await,
            Err(DocsError::NotBound { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // data / raw_data
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn data_expands_lists_into_member_ids() {
        let handle = memory_handle();
        let member = created(&handle, Content::new()).await;
        let mut list = List::new(&handle);
        list.add_id(member.id()).await.unwrap();
        let empty = List::new(&handle);

        let mut document = created(
            &handle,
            Content::new()
                .with("items", &list)
                .with("nested", Content::new().with("none", &empty)),
        )
        .await;

        let raw = document.raw_data().await.unwrap().unwrap();
        assert_eq!(raw["items"], json!(list.id().as_str()));

        let data = document.data().await.unwrap().unwrap();
        assert_eq!(data["items"], json!([member.id().as_str()]));
        assert_eq!(data["nested"], json!({"none": []}));
    }

    #[tokio::test]
    async fn data_reflects_writes_from_other_handles() {
        let handle = memory_handle();
        let mut document = created(&handle, Content::new().with("v", 1i64)).await;
        let mut other = Document::with_id(&handle, document.id().clone());
        other.update(&Content::new().with("v", 2i64)).await.unwrap();

        assert_eq!(document.data().await.unwrap().unwrap()["v"], json!(2));
    }

    // -----------------------------------------------------------------------
    // parents / delete
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn parents_attaches_a_list_when_missing() {
        let (store, handle) = memory_store();
        let id = EntityId::new("legacy");
        store
            .create(
                &id,
                EntityKind::Document,
                Some(json!({"data": {"k": 1}, "refs": {"idKeys": [], "listKeys": []}})),
            )
            .await
            .unwrap();

        let mut document = Document::with_id(&handle, id.clone());
        let parents = document.parents().await.unwrap();
        assert_eq!(parents.size().await.unwrap(), 0);

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored["parentListId"], json!(parents.id().as_str()));
        assert_eq!(stored["data"], json!({"k": 1}));

        let again = document.parents().await.unwrap();
        assert_eq!(again.id(), parents.id());
    }

    #[tokio::test]
    async fn delete_removes_record_and_parent_list_only() {
        let (store, handle) = memory_store();
        let linked = created(&handle, Content::new()).await;
        let mut list = List::new(&handle);
        list.add_id(linked.id()).await.unwrap();
        let mut document = created(
            &handle,
            Content::new().with("linked", &linked).with("items", &list),
        )
        .await;
        let parents = document.parents().await.unwrap();

        document.delete().await.unwrap();

        assert_eq!(document.state(), EntityState::Deleted);
        assert!(store.get(document.id()).await.unwrap().is_none());
        assert!(!store.contains(parents.id()));
        assert!(store.contains(linked.id()));
        assert!(store.contains(list.id()));
    }

    #[tokio::test]
    async fn delete_through_unloaded_handle_finds_parent_list() {
        let (store, handle) = memory_store();
        let mut original = created(&handle, Content::new()).await;
        let parents = original.parents().await.unwrap();

        let mut unloaded = Document::with_id(&handle, original.id().clone());
        unloaded.delete().await.unwrap();

        assert!(!store.contains(original.id()));
        assert!(!store.contains(parents.id()));
    }
}
