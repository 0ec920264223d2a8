//! Scalar and array values, the per-contract value table, and the
//! `$values.key` reference grammar
//!
//! A [`Value`] carries both rule parameters (captured from alias patterns or
//! looked up in the value table) and the runtime values handed to compiled
//! validators.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ContractError;

/// Prefix that introduces a value-table reference inside a rule phrase
pub const REFERENCE_PREFIX: &str = "$values.";

/// A scalar or array constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean (used for fixed rule parameters, e.g. negated bounds)
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// String, quotes already stripped
    Str(String),
    /// Homogeneous array of values
    List(Vec<Value>),
}

impl Value {
    /// Name of the value's type, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "array",
        }
    }

    /// Whether this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// View as an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// View as a number (integers widen to float)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// View as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// View as a list of values
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        Value::Str(s) => write!(f, "'{}'", s)?,
                        other => write!(f, "{}", other)?,
                    }
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Flat mapping from symbolic names to constants, supplied once per contract
/// and immutable while the contract is being resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueTable {
    entries: HashMap<String, Value>,
}

impl ValueTable {
    /// Create an empty value table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry (builder style)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Look up a value by name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Whether the table contains a key
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ValueTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\$values\.([A-Za-z0-9_]+)$").expect("reference grammar regex is valid")
    })
}

/// Regex fragment recognizing a reference token inside an alias placeholder.
/// Case-sensitive even inside the case-insensitive alias regex: `$values.`
/// is the only recognized spelling.
pub(crate) const REFERENCE_PATTERN: &str = r"(?-i:\$values\.[A-Za-z0-9_]+)";

/// Whether a captured token looks like a reference (well-formed or not)
pub fn is_reference(token: &str) -> bool {
    token.starts_with("$values")
}

/// Extract the key from a `$values.key` token.
///
/// Fails with [`ContractError::MalformedReference`] when the token does not
/// conform to the reference grammar.
pub fn parse_reference(token: &str) -> Result<&str, ContractError> {
    let captures = reference_regex()
        .captures(token)
        .ok_or_else(|| ContractError::MalformedReference(token.to_string()))?;
    // group 1 always participates in a successful match
    Ok(captures
        .get(1)
        .map(|m| m.as_str())
        .unwrap_or_default())
}
