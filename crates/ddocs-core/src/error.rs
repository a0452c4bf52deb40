//! Error types for the document layer.

use ddocs_store::StoreError;
use ddocs_types::EntityId;
use thiserror::Error;

/// Errors raised while flattening or rehydrating reference metadata.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// A recorded path does not resolve to a position in the stored data.
    #[error("recorded path does not exist in stored data: {path}")]
    MissingPath { path: String },

    /// A recorded path resolved, but not to an id or null.
    #[error("expected {expected} at {path}")]
    UnexpectedValue { path: String, expected: &'static str },

    /// A reference path runs through another reference leaf.
    #[error("path conflicts with an existing reference: {path}")]
    PathConflict { path: String },

    /// A key on a reference path is empty or contains the path separator.
    #[error("key {key:?} under {prefix:?} cannot be part of a reference path")]
    InvalidKey { key: String, prefix: String },

    /// An empty string was recorded as a path.
    #[error("empty reference path")]
    EmptyPath,
}

/// Errors from document and list operations.
#[derive(Debug, Error)]
pub enum DocsError {
    /// The handle has no live backend binding (never created, or deleted).
    #[error("entity not bound: {id}")]
    NotBound { id: EntityId },

    /// `init` was called on an entity that already exists.
    #[error("entity already initialized: {0}")]
    AlreadyInitialized(EntityId),

    /// The entity has never been created.
    #[error("entity not found: {0}")]
    NotFound(EntityId),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Stored content does not have the expected record shape.
    #[error("malformed record for {id}: {reason}")]
    MalformedRecord { id: EntityId, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type DocsResult<T> = Result<T, DocsError>;
