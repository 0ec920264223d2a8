//! Typed parameter grammar for alias patterns
//!
//! Each parameter type pairs a literal-syntax matcher (the textual form a
//! value takes inside a rule phrase) with a compatibility check applied when
//! a value arrives through a `$values.key` reference instead of a literal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ContractError;
use crate::value::Value;

/// The parameter types an alias placeholder may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    /// Signed integer literal, e.g. `-42`
    Integer,
    /// Float literal with a decimal point, e.g. `3.5` or `.5`
    Float,
    /// Integer or float; the presence of a decimal point decides
    Number,
    /// Single- or double-quoted string, no escape processing
    String,
    /// Bracketed comma-separated integers
    Integers,
    /// Bracketed comma-separated floats
    Floats,
    /// Bracketed comma-separated numbers
    Numbers,
    /// Bracketed comma-separated strings
    Strings,
}

impl ParamType {
    /// Look up a parameter type by its name in an alias placeholder
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Integer" => Some(ParamType::Integer),
            "Float" => Some(ParamType::Float),
            "Number" => Some(ParamType::Number),
            "String" => Some(ParamType::String),
            "Integers" => Some(ParamType::Integers),
            "Floats" => Some(ParamType::Floats),
            "Numbers" => Some(ParamType::Numbers),
            "Strings" => Some(ParamType::Strings),
            _ => None,
        }
    }

    /// The placeholder name for this type
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::Integer => "Integer",
            ParamType::Float => "Float",
            ParamType::Number => "Number",
            ParamType::String => "String",
            ParamType::Integers => "Integers",
            ParamType::Floats => "Floats",
            ParamType::Numbers => "Numbers",
            ParamType::Strings => "Strings",
        }
    }

    /// The element type of an array form, if this is one
    pub fn element_type(&self) -> Option<ParamType> {
        match self {
            ParamType::Integers => Some(ParamType::Integer),
            ParamType::Floats => Some(ParamType::Float),
            ParamType::Numbers => Some(ParamType::Number),
            ParamType::Strings => Some(ParamType::String),
            _ => None,
        }
    }

    /// Whether this is an array form
    pub fn is_array(&self) -> bool {
        self.element_type().is_some()
    }

    /// Regex fragment recognizing this type's literal form
    pub fn literal_pattern(&self) -> &'static str {
        match self {
            ParamType::Integer => r"-?\d+",
            ParamType::Float => r"-?\d*\.\d+",
            ParamType::Number => r"-?\d+\.?\d*",
            ParamType::String => r#""[^"]*"|'[^']*'"#,
            // array contents are re-parsed element by element after capture
            ParamType::Integers
            | ParamType::Floats
            | ParamType::Numbers
            | ParamType::Strings => r"\[[^\]]*\]",
        }
    }

    /// Parse a captured literal into a [`Value`].
    ///
    /// The text is guaranteed by the alias matcher to fit
    /// [`Self::literal_pattern`] for scalar types; array elements are only
    /// checked here, failing with
    /// [`ContractError::IncompatibleElementType`] when one does not parse
    /// under the element grammar.
    pub fn parse_literal(&self, text: &str) -> Result<Value, ContractError> {
        match self {
            ParamType::Integer => text
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| self.incompatible(text)),
            ParamType::Float => text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.incompatible(text)),
            ParamType::Number => {
                if text.contains('.') {
                    text.parse::<f64>()
                        .map(Value::Float)
                        .map_err(|_| self.incompatible(text))
                } else {
                    text.parse::<i64>()
                        .map(Value::Int)
                        .map_err(|_| self.incompatible(text))
                }
            }
            ParamType::String => {
                let stripped = strip_quotes(text).ok_or_else(|| self.incompatible(text))?;
                Ok(Value::Str(stripped.to_string()))
            }
            ParamType::Integers | ParamType::Floats | ParamType::Numbers | ParamType::Strings => {
                // element_type is Some for every array form
                let element = self.element_type().unwrap_or(ParamType::String);
                let inner = text
                    .strip_prefix('[')
                    .and_then(|t| t.strip_suffix(']'))
                    .ok_or_else(|| self.incompatible(text))?;
                let mut items = Vec::new();
                for part in split_elements(inner) {
                    let part = part.trim();
                    if !element.matches_literal(part) {
                        return Err(ContractError::IncompatibleElementType {
                            expected: element.name().to_string(),
                            found: part.to_string(),
                        });
                    }
                    items.push(element.parse_literal(part)?);
                }
                Ok(Value::List(items))
            }
        }
    }

    /// Whether a text fully matches this type's literal grammar
    pub fn matches_literal(&self, text: &str) -> bool {
        match self {
            ParamType::Integer => text.parse::<i64>().is_ok(),
            ParamType::Float => text.contains('.') && text.parse::<f64>().is_ok(),
            ParamType::Number => text.parse::<i64>().is_ok() || text.parse::<f64>().is_ok(),
            ParamType::String => strip_quotes(text).is_some(),
            _ => text.starts_with('[') && text.ends_with(']'),
        }
    }

    /// Check a value looked up through a reference against this type.
    ///
    /// Mirrors the literal grammar: an `Integer` placeholder only accepts an
    /// integer value, a `Number` accepts either numeric kind, array forms
    /// re-validate every element.
    pub fn check_resolved(&self, value: &Value) -> Result<(), ContractError> {
        let compatible = match self {
            ParamType::Integer => matches!(value, Value::Int(_)),
            ParamType::Float => matches!(value, Value::Float(_)),
            ParamType::Number => matches!(value, Value::Int(_) | Value::Float(_)),
            ParamType::String => matches!(value, Value::Str(_)),
            ParamType::Integers | ParamType::Floats | ParamType::Numbers | ParamType::Strings => {
                let element = self.element_type().unwrap_or(ParamType::String);
                match value {
                    Value::List(items) => {
                        for item in items {
                            element.check_resolved(item)?;
                        }
                        true
                    }
                    _ => false,
                }
            }
        };
        if compatible {
            Ok(())
        } else {
            Err(ContractError::IncompatibleElementType {
                expected: self.name().to_string(),
                found: value.to_string(),
            })
        }
    }

    fn incompatible(&self, text: &str) -> ContractError {
        ContractError::IncompatibleElementType {
            expected: self.name().to_string(),
            found: text.to_string(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn strip_quotes(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let quote = bytes[0];
    if (quote == b'"' || quote == b'\'') && bytes[bytes.len() - 1] == quote {
        let inner = &text[1..text.len() - 1];
        if !inner.contains(quote as char) {
            return Some(inner);
        }
    }
    None
}

/// Split the contents of an array literal on commas, honoring quoted strings
fn split_elements(inner: &str) -> Vec<&str> {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    for (i, c) in inner.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                ',' => {
                    parts.push(&inner[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&inner[start..]);
    parts
}
