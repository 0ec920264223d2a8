//! Alias pattern compiler and matcher
//!
//! An alias pattern such as `"Length between {min_len:Integer} and
//! {max_len:Integer}"` is tokenized once into literal spans and typed
//! placeholders, then turned into an anchored, case-insensitive regex. A
//! placeholder accepts either the type's literal form or a `$values.key`
//! reference; which form matched decides whether the captured parameter is a
//! literal value or a deferred reference.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ContractError, Result};
use crate::params::ParamType;
use crate::value::{self, Value, REFERENCE_PATTERN};

/// One captured parameter, before reference resolution
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedParam {
    /// A literal value parsed under the placeholder's grammar
    Literal(Value),
    /// A `$values.key` reference, kept as the key until resolution
    Reference(String),
}

impl CapturedParam {
    /// Render the parameter back to its original textual form: literals as
    /// values, references as `$values.key` tokens
    pub fn to_display_value(&self) -> Value {
        match self {
            CapturedParam::Literal(v) => v.clone(),
            CapturedParam::Reference(key) => {
                Value::Str(format!("{}{}", value::REFERENCE_PREFIX, key))
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Placeholder { name: String, ty: ParamType },
}

/// A compiled alias pattern
#[derive(Debug)]
pub struct AliasPattern {
    alias: String,
    segments: Vec<Segment>,
    params: Vec<(String, ParamType)>,
    regex_src: String,
    compiled: OnceLock<Regex>,
}

impl Clone for AliasPattern {
    fn clone(&self) -> Self {
        Self {
            alias: self.alias.clone(),
            segments: self.segments.clone(),
            params: self.params.clone(),
            regex_src: self.regex_src.clone(),
            compiled: OnceLock::new(),
        }
    }
}

impl AliasPattern {
    /// Tokenize and validate an alias pattern.
    ///
    /// Fails with [`ContractError::ParameterMismatch`] on unbalanced braces,
    /// invalid placeholder names, duplicate placeholders, or unknown
    /// parameter types; these are registration-time authoring defects.
    pub fn compile(alias: &str) -> Result<Self> {
        let segments = tokenize(alias)?;
        let mut params = Vec::new();
        for segment in &segments {
            if let Segment::Placeholder { name, ty } = segment {
                if params.iter().any(|(n, _)| n == name) {
                    return Err(ContractError::ParameterMismatch(format!(
                        "duplicate placeholder '{{{name}}}' in alias '{alias}'"
                    )));
                }
                params.push((name.clone(), *ty));
            }
        }
        let regex_src = build_regex_src(&segments);
        Ok(Self {
            alias: alias.to_string(),
            segments,
            params,
            regex_src,
            compiled: OnceLock::new(),
        })
    }

    /// The original alias text
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Placeholder names and types, in order of appearance
    pub fn params(&self) -> &[(String, ParamType)] {
        &self.params
    }

    /// Look up the declared type of a placeholder
    pub fn param_type(&self, name: &str) -> Option<ParamType> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
    }

    fn regex(&self) -> &Regex {
        // the source is built from escaped literals and fixed fragments, so
        // compilation cannot fail; guarded for lazy first use under
        // concurrent contract builds
        self.compiled.get_or_init(|| {
            Regex::new(&self.regex_src).expect("alias pattern regex is valid by construction")
        })
    }

    /// Attempt to match a raw rule phrase against this pattern.
    ///
    /// Returns `Ok(None)` on a plain mismatch (the normal "try the next
    /// template" signal) and the captured parameters on success. Array
    /// literals with incompatible elements fail with
    /// [`ContractError::IncompatibleElementType`].
    pub fn match_phrase(&self, phrase: &str) -> Result<Option<BTreeMap<String, CapturedParam>>> {
        let captures = match self.regex().captures(phrase) {
            Some(captures) => captures,
            None => return Ok(None),
        };
        let mut captured = BTreeMap::new();
        for (name, ty) in &self.params {
            let text = match captures.name(name) {
                Some(m) => m.as_str(),
                None => return Ok(None),
            };
            let param = if value::is_reference(text) {
                CapturedParam::Reference(value::parse_reference(text)?.to_string())
            } else {
                CapturedParam::Literal(ty.parse_literal(text)?)
            };
            captured.insert(name.clone(), param);
        }
        Ok(Some(captured))
    }
}

fn tokenize(alias: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = alias.char_indices();
    while let Some((i, c)) = chars.next() {
        if c != '{' {
            if c == '}' {
                return Err(ContractError::ParameterMismatch(format!(
                    "unbalanced '}}' at offset {i} in alias '{alias}'"
                )));
            }
            literal.push(c);
            continue;
        }
        let rest = &alias[i + 1..];
        let end = rest.find('}').ok_or_else(|| {
            ContractError::ParameterMismatch(format!(
                "unclosed placeholder at offset {i} in alias '{alias}'"
            ))
        })?;
        let body = &rest[..end];
        let (name, ty_name) = body.split_once(':').ok_or_else(|| {
            ContractError::ParameterMismatch(format!(
                "placeholder '{{{body}}}' in alias '{alias}' is missing a type"
            ))
        })?;
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            || name.starts_with(|c: char| c.is_ascii_digit())
        {
            return Err(ContractError::ParameterMismatch(format!(
                "invalid placeholder name '{name}' in alias '{alias}'"
            )));
        }
        let ty = ParamType::from_name(ty_name).ok_or_else(|| {
            ContractError::ParameterMismatch(format!(
                "unknown parameter type '{ty_name}' in alias '{alias}'"
            ))
        })?;
        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Placeholder {
            name: name.to_string(),
            ty,
        });
        // skip past the placeholder body and closing brace
        for _ in 0..=end {
            chars.next();
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn build_regex_src(segments: &[Segment]) -> String {
    let mut src = String::from("(?i)^");
    for segment in segments {
        match segment {
            Segment::Literal(text) => src.push_str(&regex::escape(text)),
            Segment::Placeholder { name, ty } => {
                src.push_str(&format!(
                    "(?P<{name}>{lit}|{reference})",
                    lit = ty.literal_pattern(),
                    reference = REFERENCE_PATTERN,
                ));
            }
        }
    }
    src.push('$');
    src
}
