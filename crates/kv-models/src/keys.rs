use crate::error::{ModelError, ModelResult};
use std::fmt;

/// Index sections within a collection's key namespace.
///
/// Unique entries live under `indexes`, equality sets under `sets`, and the
/// per-field sorted structures under `views`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Indexes,
    Sets,
    Views,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indexes => "indexes",
            Self::Sets => "sets",
            Self::Views => "views",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a store key: `models:{collection}:{section}:{field}[:{value}]`.
///
/// Injective with respect to (section, field, value) and collision-free across
/// collections since the collection name is always the leading segment.
/// Segments are joined unescaped, so a field name containing `:` can collide
/// with another (field, value) pair; declare index fields without `:`.
/// Empty segments are a caller contract violation.
pub fn store_key(
    collection: &str,
    section: Section,
    field: &str,
    value: Option<&str>,
) -> ModelResult<String> {
    if collection.is_empty() {
        return Err(ModelError::InvalidKey("empty collection name".into()));
    }
    if field.is_empty() {
        return Err(ModelError::InvalidKey("empty field name".into()));
    }
    match value {
        Some("") => Err(ModelError::InvalidKey(format!(
            "empty value segment for field {field}"
        ))),
        Some(v) => Ok(format!("models:{collection}:{section}:{field}:{v}")),
        None => Ok(format!("models:{collection}:{section}:{field}")),
    }
}
