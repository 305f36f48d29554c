use crate::error::{ModelError, ModelResult};
use crate::index::{IndexDescriptor, IndexKind};
use std::collections::BTreeMap;

/// Per-collection mapping from field name to index descriptor.
///
/// Declarations happen once at collection setup, before any document traffic.
/// A field holds at most one index kind; declaring a second index on the same
/// field is rejected rather than silently replacing the first.
#[derive(Debug, Default, Clone)]
pub struct IndexRegistry {
    descriptors: BTreeMap<String, IndexDescriptor>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a unique lookup index on a field.
    pub fn declare_unique(&mut self, field: &str) -> ModelResult<()> {
        self.declare(field, IndexKind::Unique)
    }

    /// Declare an inverted-set equality index on a field.
    pub fn declare_set(&mut self, field: &str) -> ModelResult<()> {
        self.declare(field, IndexKind::Set)
    }

    /// Declare a sorted-set range/order index on a field.
    pub fn declare_sorted(&mut self, field: &str) -> ModelResult<()> {
        self.declare(field, IndexKind::Sorted)
    }

    fn declare(&mut self, field: &str, kind: IndexKind) -> ModelResult<()> {
        if self.descriptors.contains_key(field) {
            return Err(ModelError::DuplicateIndex(field.to_owned()));
        }
        self.descriptors
            .insert(field.to_owned(), IndexDescriptor::new(field, kind));
        Ok(())
    }

    pub fn descriptor_for(&self, field: &str) -> Option<&IndexDescriptor> {
        self.descriptors.get(field)
    }

    /// True if the field can appear in an equality query (Unique or Set).
    /// Sorted indexes are range-queryable via the sort directive only.
    pub fn is_queryable(&self, field: &str) -> bool {
        matches!(
            self.descriptors.get(field).map(IndexDescriptor::kind),
            Some(IndexKind::Unique) | Some(IndexKind::Set)
        )
    }

    /// True if the field can appear in a sort directive.
    pub fn is_sortable(&self, field: &str) -> bool {
        matches!(
            self.descriptors.get(field).map(IndexDescriptor::kind),
            Some(IndexKind::Sorted)
        )
    }

    /// All descriptors of a given kind, in field-name order.
    pub fn of_kind(&self, kind: IndexKind) -> impl Iterator<Item = &IndexDescriptor> {
        self.descriptors.values().filter(move |d| d.kind() == kind)
    }

    pub fn fields(&self) -> Vec<&str> {
        self.descriptors.keys().map(String::as_str).collect()
    }
}
