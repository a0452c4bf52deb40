//! Request/response form of the entity contract.
//!
//! Transports that carry gateway calls as messages encode an
//! [`EntityRequest`] per call and hand it to [`dispatch`] on the receiving
//! side.

use ddocs_types::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::StoreResult;
use crate::traits::EntityStore;

/// A single call addressed to one entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum EntityRequest {
    Create {
        kind: EntityKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<JsonValue>,
    },
    Get,
    Replace {
        content: JsonValue,
    },
    Merge {
        content: JsonValue,
    },
    Delete,
}

impl EntityRequest {
    pub fn op_name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Get => "get",
            Self::Replace { .. } => "replace",
            Self::Merge { .. } => "merge",
            Self::Delete => "delete",
        }
    }

    /// Whether the request can change stored state.
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

/// Result of a successfully handled [`EntityRequest`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EntityResponse {
    Created,
    Content { content: Option<JsonValue> },
    Written,
    Deleted { existed: bool },
}

/// Route a request to the matching [`EntityStore`] method.
pub async fn dispatch<S>(
    store: &S,
    id: &EntityId,
    request: EntityRequest,
) -> StoreResult<EntityResponse>
where
    S: EntityStore + ?Sized,
{
    tracing::trace!(id = %id, op = request.op_name(), "dispatching entity request");
    match request {
        EntityRequest::Create { kind, payload } => {
            store.create(id, kind, payload).await?;
            Ok(EntityResponse::Created)
        }
        EntityRequest::Get => Ok(EntityResponse::Content {
            content: store.get(id).await?,
        }),
        EntityRequest::Replace { content } => {
            store.replace(id, content).await?;
            Ok(EntityResponse::Written)
        }
        EntityRequest::Merge { content } => {
            store.merge(id, content).await?;
            Ok(EntityResponse::Written)
        }
        EntityRequest::Delete => Ok(EntityResponse::Deleted {
            existed: store.delete(id).await?,
        }),
    }
}
