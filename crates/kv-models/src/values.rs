use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value type for schemaless document fields.
///
/// Covers the JSON types plus a distinct integer variant, so numeric index
/// scores can be taken from either Int64 or Float64 without loss for the
/// common integer case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Array(Vec<FieldValue>),
    Object(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Returns the type name as a string, useful for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Int64(_) => "int64",
            Self::Float64(_) => "float64",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(n) => Some(*n),
            Self::Int64(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Render the value as a store-key segment.
    ///
    /// Only non-empty scalars are addressable by index keys; Null, the empty
    /// string, Array and Object return None and are treated as "not indexed"
    /// by callers.
    pub fn key_segment(&self) -> Option<String> {
        match self {
            Self::Boolean(b) => Some(b.to_string()),
            Self::Int64(n) => Some(n.to_string()),
            Self::Float64(n) => Some(n.to_string()),
            Self::String(s) if !s.is_empty() => Some(s.clone()),
            Self::String(_) | Self::Null | Self::Array(_) | Self::Object(_) => None,
        }
    }

    /// Numeric score for sorted indexes. Non-numeric values score 0.0.
    pub fn score(&self) -> f64 {
        self.as_f64().unwrap_or(0.0)
    }
}

// Manual PartialEq: NaN != NaN for Float64, standard equality for everything else.
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// From conversions for ergonomic value construction
// ---------------------------------------------------------------------------

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

// ---------------------------------------------------------------------------
// JSON interop — convert between FieldValue and serde_json::Value
// ---------------------------------------------------------------------------

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int64(i)
                } else {
                    Self::Float64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(arr) => Self::Array(arr.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(obj) => {
                Self::Object(obj.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<FieldValue> for serde_json::Value {
    fn from(v: FieldValue) -> Self {
        match v {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Boolean(b) => serde_json::Value::Bool(b),
            FieldValue::Int64(i) => serde_json::json!(i),
            FieldValue::Float64(f) => serde_json::json!(f),
            FieldValue::String(s) => serde_json::Value::String(s),
            FieldValue::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            FieldValue::Object(obj) => serde_json::Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Helper macro for constructing a document attribute map inline.
///
/// # Example
/// ```
/// use kv_models::attrs;
///
/// let fields = attrs! {
///     "email" => "a@x",
///     "age" => 20i64,
/// };
/// assert_eq!(fields.len(), 2);
/// ```
#[macro_export]
macro_rules! attrs {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map = std::collections::BTreeMap::new();
        $(
            map.insert($key.to_string(), $crate::values::FieldValue::from($value));
        )*
        map
    }};
}
