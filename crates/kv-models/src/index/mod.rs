mod registry;

pub use registry::IndexRegistry;

use crate::error::ModelResult;
use crate::keys::{store_key, Section};
use crate::values::FieldValue;

/// The structure an index maintains in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// One field value maps to exactly one document id, enforced on save.
    Unique,
    /// One field value maps to the set of document ids sharing it.
    Set,
    /// One per-field sorted structure maps document id to a numeric score.
    Sorted,
}

/// Describes one declared index on a collection field.
///
/// Created at collection configuration time and immutable thereafter; store
/// keys are computed on demand from the descriptor rather than cached per
/// observed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    field: String,
    kind: IndexKind,
}

impl IndexDescriptor {
    pub fn new(field: impl Into<String>, kind: IndexKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Store key for this index and a concrete field value.
    ///
    /// Unique and Set entries are keyed per value; the Sorted structure is one
    /// key per field, so the value is ignored there.
    pub fn entry_key(&self, collection: &str, value: &str) -> ModelResult<String> {
        match self.kind {
            IndexKind::Unique => store_key(collection, Section::Indexes, &self.field, Some(value)),
            IndexKind::Set => store_key(collection, Section::Sets, &self.field, Some(value)),
            IndexKind::Sorted => store_key(collection, Section::Views, &self.field, None),
        }
    }

    /// Key of the per-field sorted structure. Only meaningful for Sorted.
    pub fn view_key(&self, collection: &str) -> ModelResult<String> {
        store_key(collection, Section::Views, &self.field, None)
    }

    /// Scalar key segment of the document's value for this field, if any.
    pub fn value_segment(&self, value: Option<&FieldValue>) -> Option<String> {
        value.and_then(FieldValue::key_segment)
    }
}
