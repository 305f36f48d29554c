use crate::kv::KvError;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    /// A declared-unique field is absent (or has no scalar value) on a document
    /// being saved.
    #[error("missing indexed property: {0}")]
    MissingIndexedProperty(String),
    /// The unique constraint on a field is violated by another live document.
    #[error("duplicate key for unique index: {0}")]
    DuplicateKey(String),
    /// A second index declaration for a field that already has one.
    #[error("index already declared for field: {0}")]
    DuplicateIndex(String),
    /// A query referenced a field with no Unique or Set index.
    #[error("non-indexed property in query: {0}")]
    NonIndexedProperty(String),
    /// A sort directive referenced a field with no Sorted index.
    #[error("non-sortable property in sort: {0}")]
    NonSortableProperty(String),
    /// Malformed query or options, e.g. a multi-key load-by-object.
    #[error("invalid query shape: {0}")]
    InvalidQueryShape(String),
    /// A store key segment was empty (caller contract violation).
    #[error("invalid store key: {0}")]
    InvalidKey(String),
    #[error("document not found: {0}")]
    DocumentNotFound(String),
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A key-value store request failed; `context` names the operation and
    /// index involved for diagnosability.
    #[error("store error during {context}: {source}")]
    Store {
        context: String,
        #[source]
        source: KvError,
    },
}

impl ModelError {
    /// Wrap a transport error with the operation/index it occurred in.
    pub fn store(context: impl Into<String>, source: KvError) -> Self {
        Self::Store {
            context: context.into(),
            source,
        }
    }
}
