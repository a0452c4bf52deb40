use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Opaque identifier of a stored entity.
///
/// Ids are allocated by the storage gateway, stay stable for the lifetime of
/// the entity, and may be reused later to rebind a handle to the same entity.
/// Nothing outside the gateway interprets their contents.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an existing id without validation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse an id, rejecting the empty string.
    pub fn parse(id: &str) -> Result<Self, TypeError> {
        if id.is_empty() {
            return Err(TypeError::EmptyId);
        }
        Ok(Self(id.to_string()))
    }

    /// Allocate a fresh, globally unique id (UUID v7, hyphen-less).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Reference token: a placeholder for a document reference that may not be
/// materialized yet.
///
/// A token only carries an id. An unset token (`id == None`) is stored as
/// `null` and skipped when references are rebuilt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    pub id: Option<EntityId>,
}

impl ObjectId {
    /// An unset reference.
    pub fn unset() -> Self {
        Self { id: None }
    }

    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }

    pub fn is_set(&self) -> bool {
        self.id.is_some()
    }
}

impl From<EntityId> for ObjectId {
    fn from(id: EntityId) -> Self {
        Self { id: Some(id) }
    }
}
