//! Call options: the per-call argument mapping
//!
//! Arguments are kept in insertion order and consumed once to build a request
//! body. The body encoding is chosen by payload shape: if any argument carries a
//! binary payload the whole body is sent as multipart form data, otherwise as
//! URL-encoded key/value pairs.

use serde_json::Value;

/// A single argument value attached to an API call
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Plain text value
    Text(String),
    /// Integer value, rendered in decimal
    Int(i64),
    /// Floating-point value
    Float(f64),
    /// Boolean value, rendered as `true`/`false`
    Bool(bool),
    /// Binary payload (file upload); forces multipart encoding
    Binary {
        /// File name reported in the multipart part
        filename: String,
        /// Raw payload bytes
        bytes: Vec<u8>,
    },
    /// Nested structure, rendered as compact JSON
    Json(Value),
}

impl ArgValue {
    /// Render the value as the string form used in URL-encoded bodies.
    ///
    /// Binary payloads have no string form; callers must check
    /// [`CallOptions::has_binary`] first.
    fn to_field(&self) -> Option<String> {
        match self {
            ArgValue::Text(s) => Some(s.clone()),
            ArgValue::Int(i) => Some(i.to_string()),
            ArgValue::Float(f) => Some(f.to_string()),
            ArgValue::Bool(b) => Some(b.to_string()),
            ArgValue::Json(v) => Some(v.to_string()),
            ArgValue::Binary { .. } => None,
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Text(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Text(s)
    }
}

impl From<i64> for ArgValue {
    fn from(i: i64) -> Self {
        ArgValue::Int(i)
    }
}

impl From<f64> for ArgValue {
    fn from(f: f64) -> Self {
        ArgValue::Float(f)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Bool(b)
    }
}

impl From<Value> for ArgValue {
    fn from(v: Value) -> Self {
        ArgValue::Json(v)
    }
}

/// Immutable-per-call mapping from argument name to value
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    args: Vec<(String, ArgValue)>,
}

impl CallOptions {
    /// Create an empty option set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an argument, preserving first-insertion order
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.set(name.into(), value.into());
        self
    }

    fn set(&mut self, name: String, value: ArgValue) {
        if let Some(slot) = self.args.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.args.push((name, value));
        }
    }

    /// Look up an argument by name
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.args.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether the option set is empty
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// True if any argument carries a binary payload (forces multipart encoding)
    pub fn has_binary(&self) -> bool {
        self.args
            .iter()
            .any(|(_, v)| matches!(v, ArgValue::Binary { .. }))
    }

    /// Replace the pagination cursor, overriding any caller-supplied `cursor`
    pub fn with_cursor(mut self, cursor: &str) -> Self {
        self.set("cursor".to_string(), ArgValue::Text(cursor.to_string()));
        self
    }

    /// Iterate over `(name, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.args.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Encode the options into form fields, multipart parts when any value is binary.
    pub(crate) fn encode(&self) -> crate::executor::RequestBody {
        use crate::executor::{FormPart, RequestBody};

        if self.has_binary() {
            let parts = self
                .args
                .iter()
                .map(|(name, value)| match value {
                    ArgValue::Binary { filename, bytes } => FormPart::File {
                        name: name.clone(),
                        filename: filename.clone(),
                        bytes: bytes.clone(),
                    },
                    other => FormPart::Field {
                        name: name.clone(),
                        // to_field() is Some for every non-binary variant
                        value: other.to_field().unwrap_or_default(),
                    },
                })
                .collect();
            RequestBody::Multipart(parts)
        } else {
            let fields = self
                .args
                .iter()
                .filter_map(|(name, value)| value.to_field().map(|v| (name.clone(), v)))
                .collect();
            RequestBody::Form(fields)
        }
    }
}
