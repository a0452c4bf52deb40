use ddocs_types::EntityId;

/// Errors from storage gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Create was called on an entity that already exists.
    #[error("entity already initialized: {0}")]
    AlreadyInitialized(EntityId),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Failure of the underlying storage substrate.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
