use crate::values::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A document in a collection.
///
/// Carries a collection-assigned identifier and a revision counter that
/// increments on every successful save. User fields are an arbitrary
/// attribute mapping; the synchronizer reads them but never owns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    rev: u64,
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    /// Create an unsaved document (rev 0) with the given id and fields.
    pub fn new(id: impl Into<String>, fields: BTreeMap<String, FieldValue>) -> Self {
        Self {
            id: id.into(),
            rev: 0,
            fields,
        }
    }

    /// Generate a document with a fresh UUID v7 (time-ordered) identifier.
    pub fn generate(fields: BTreeMap<String, FieldValue>) -> Self {
        Self::new(uuid::Uuid::now_v7().to_string(), fields)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rev(&self) -> u64 {
        self.rev
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Get a field value by name.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Set a field value, returning the previous value if any.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(field.into(), value.into())
    }

    /// Remove a field, returning its previous value if it existed.
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.fields.remove(field)
    }

    /// Bump the revision counter. Called by the collection once the
    /// persistence write is about to be accepted.
    pub(crate) fn bump_rev(&mut self) {
        self.rev += 1;
    }
}
