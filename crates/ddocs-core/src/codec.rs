//! Reference codec: flattening live trees for storage and rebuilding
//! reference handles from stored metadata.
//!
//! Only ids cross the persistence boundary. A stored document holds its
//! flattened data plus the dotted paths at which ids stand in for lists and
//! documents; [`rehydrate`] turns those paths back into handles.

use ddocs_types::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::document::Document;
use crate::error::CodecError;
use crate::handle::StorageHandle;
use crate::list::List;
use crate::reftree::{RefNode, RefTree};
use crate::value::{Content, Value};

/// Dotted paths of the reference leaves in a flattened tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefKeys {
    /// Paths holding document ids (documents and reference tokens).
    #[serde(default)]
    pub id_keys: Vec<String>,
    /// Paths holding list ids.
    #[serde(default)]
    pub list_keys: Vec<String>,
}

impl RefKeys {
    pub fn is_empty(&self) -> bool {
        self.id_keys.is_empty() && self.list_keys.is_empty()
    }

    fn extend(&mut self, other: RefKeys) {
        self.id_keys.extend(other.id_keys);
        self.list_keys.extend(other.list_keys);
    }
}

/// Stored form of a document: flattened data, reference paths, and the id of
/// the document's parent list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRefDef {
    #[serde(default)]
    pub data: Map<String, JsonValue>,
    #[serde(default)]
    pub refs: RefKeys,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_list_id: Option<EntityId>,
}

/// Keys on a reference path must survive a round trip through `split('.')`.
fn check_key(prefix: &str, key: &str) -> Result<(), CodecError> {
    if key.is_empty() || key.contains('.') {
        return Err(CodecError::InvalidKey {
            key: key.to_string(),
            prefix: prefix.to_string(),
        });
    }
    Ok(())
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Flatten a live tree into persist-safe data plus reference paths.
///
/// Keys are walked depth-first in key order. Reference leaves become their id
/// (`null` for an unset token) and their path is recorded; nested objects are
/// recursed into; everything else, arrays included, is copied unchanged.
///
/// Fails with [`CodecError::InvalidKey`] if a key that is part of a reference
/// path is empty or contains a `.`. Such keys are fine on plain data.
pub fn flatten(content: &Content, prefix: &str) -> Result<ContentRefDef, CodecError> {
    let mut data = Map::new();
    let mut refs = RefKeys::default();

    for (key, value) in content {
        let path = join_path(prefix, key);
        let flat = match value {
            Value::Scalar(v) => v.clone(),
            Value::Date(date) => JsonValue::String(date.to_rfc3339()),
            Value::List(id) => {
                check_key(prefix, key)?;
                refs.list_keys.push(path);
                JsonValue::String(id.to_string())
            }
            Value::Document(id) => {
                check_key(prefix, key)?;
                refs.id_keys.push(path);
                JsonValue::String(id.to_string())
            }
            Value::Token(token) => {
                check_key(prefix, key)?;
                refs.id_keys.push(path);
                match &token.id {
                    Some(id) => JsonValue::String(id.to_string()),
                    None => JsonValue::Null,
                }
            }
            Value::Object(nested) => {
                let inner = flatten(nested, &path)?;
                if !inner.refs.is_empty() {
                    check_key(prefix, key)?;
                }
                refs.extend(inner.refs);
                JsonValue::Object(inner.data)
            }
        };
        data.insert(key.clone(), flat);
    }

    Ok(ContentRefDef {
        data,
        refs,
        parent_list_id: None,
    })
}

/// Resolve a dotted path in stored data.
pub(crate) fn resolve<'a>(
    data: &'a Map<String, JsonValue>,
    path: &str,
) -> Result<&'a JsonValue, CodecError> {
    if path.is_empty() {
        return Err(CodecError::EmptyPath);
    }
    let missing = || CodecError::MissingPath {
        path: path.to_string(),
    };
    let mut segments = path.split('.');
    let first = segments.next().ok_or_else(missing)?;
    let mut current = data.get(first).ok_or_else(missing)?;
    for segment in segments {
        current = current
            .as_object()
            .and_then(|obj| obj.get(segment))
            .ok_or_else(missing)?;
    }
    Ok(current)
}

/// Mutable variant of [`resolve`].
pub(crate) fn resolve_mut<'a>(
    data: &'a mut Map<String, JsonValue>,
    path: &str,
) -> Result<&'a mut JsonValue, CodecError> {
    if path.is_empty() {
        return Err(CodecError::EmptyPath);
    }
    let missing = || CodecError::MissingPath {
        path: path.to_string(),
    };
    let mut segments = path.split('.');
    let first = segments.next().ok_or_else(missing)?;
    let mut current = data.get_mut(first).ok_or_else(missing)?;
    for segment in segments {
        current = current
            .as_object_mut()
            .and_then(|obj| obj.get_mut(segment))
            .ok_or_else(missing)?;
    }
    Ok(current)
}

/// Rebuild the reference tree for stored data.
///
/// List paths are processed first, then id paths, each in recorded order. A
/// list stored as `null` becomes an unbound list; a document id stored as
/// `null` is left out of the tree. Lists are attached to `owner` so that
/// documents added to them can point back at it. Handles are bound but not
/// fetched.
///
/// Fails on the first recorded path that does not exist in `data`.
pub fn rehydrate(
    data: &Map<String, JsonValue>,
    refs: &RefKeys,
    handle: &StorageHandle,
    owner: Option<&EntityId>,
) -> Result<RefTree, CodecError> {
    let mut tree = RefTree::new();

    for path in &refs.list_keys {
        let list = match resolve(data, path)? {
            JsonValue::String(id) if !id.is_empty() => {
                List::with_id(handle, EntityId::new(id.as_str()))
            }
            JsonValue::String(_) | JsonValue::Null => List::new(handle),
            _ => {
                return Err(CodecError::UnexpectedValue {
                    path: path.clone(),
                    expected: "list id or null",
                })
            }
        };
        let list = match owner {
            Some(owner) => list.with_parent(owner.clone()),
            None => list,
        };
        tree.insert(path, RefNode::List(list))?;
    }

    for path in &refs.id_keys {
        match resolve(data, path)? {
            JsonValue::String(id) if !id.is_empty() => {
                let document = Document::with_id(handle, EntityId::new(id.as_str()));
                tree.insert(path, RefNode::Document(document))?;
            }
            JsonValue::String(_) | JsonValue::Null => continue,
            _ => {
                return Err(CodecError::UnexpectedValue {
                    path: path.clone(),
                    expected: "document id or null",
                })
            }
        }
    }

    Ok(tree)
}

/// Whether writing `patch` with a deep merge replaces the value at `path`.
fn shadowed(patch: &Map<String, JsonValue>, path: &str) -> bool {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = patch;
    for (i, segment) in segments.iter().enumerate() {
        match current.get(*segment) {
            None => return false,
            Some(_) if i + 1 == segments.len() => return true,
            Some(JsonValue::Object(obj)) => current = obj,
            Some(_) => return true,
        }
    }
    false
}

/// Reference paths after deep-merging `patch_data` (with its own paths
/// `patch_refs`) into a document whose stored paths are `existing`.
///
/// Stored paths survive unless the patch overwrites them or one of their
/// ancestors; the patch's paths are appended after them.
pub fn merge_ref_keys(
    existing: &RefKeys,
    patch_data: &Map<String, JsonValue>,
    patch_refs: &RefKeys,
) -> RefKeys {
    let keep = |path: &&String| !shadowed(patch_data, path);
    let mut id_keys: Vec<String> = existing.id_keys.iter().filter(keep).cloned().collect();
    let mut list_keys: Vec<String> = existing.list_keys.iter().filter(keep).cloned().collect();

    for path in &patch_refs.id_keys {
        if !id_keys.contains(path) {
            id_keys.push(path.clone());
        }
    }
    for path in &patch_refs.list_keys {
        if !list_keys.contains(path) {
            list_keys.push(path.clone());
        }
    }

    RefKeys { id_keys, list_keys }
}
