use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("entity id must not be empty")]
    EmptyId,

    #[error("unknown entity kind: {0}")]
    UnknownKind(String),
}
