//! Field validator assembly
//!
//! Turns the ordered rule specifications declared for one field into a
//! [`FieldValidator`]: an ordered set of compiled predicates plus the
//! derived optionality flag. Fields start optional; resolving the reserved
//! "Is not null" rule flips them to required as a build-time side effect.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ContractError, Result, ValidationFailure};
use crate::logical::{LogicalOperator, LogicalRule, ProcessedRule, RuleDescription};
use crate::matched::MatchedRule;
use crate::registry::{FieldTypeId, RuleRegistry};
use crate::resolver::RuleResolver;
use crate::value::{Value, ValueTable};

/// A compiled validator predicate over a single value
pub type Validator = Box<dyn Fn(&Value) -> std::result::Result<(), ValidationFailure> + Send + Sync>;

/// The field a rule's validator factory is bound to: carries the state a
/// factory may read or flip while the field's validators are being built
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInstance {
    /// Declared field name
    pub name: String,
    /// Declared field type
    pub field_type: FieldTypeId,
    /// Starts true; the "Is not null" rule flips it to false
    pub is_optional: bool,
}

impl FieldInstance {
    /// Create a field instance; fields start optional
    pub fn new(name: impl Into<String>, field_type: impl Into<FieldTypeId>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            is_optional: true,
        }
    }
}

/// One declared rule for a field: either a raw phrase or a logical grouping
/// whose members are recursively resolved the same way.
///
/// Deserializes from a plain string or a one-key operator map, e.g.
/// `{"AND": ["Is not null", "Is positive"]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSpec {
    /// A raw rule phrase
    Phrase(String),
    /// An operator mapped to nested rule specs; must hold exactly one key
    Logical(BTreeMap<LogicalOperator, Vec<RuleSpec>>),
}

impl RuleSpec {
    /// A phrase spec
    pub fn phrase(text: impl Into<String>) -> Self {
        RuleSpec::Phrase(text.into())
    }

    /// An AND grouping
    pub fn all(specs: impl IntoIterator<Item = RuleSpec>) -> Self {
        RuleSpec::Logical(BTreeMap::from([(
            LogicalOperator::And,
            specs.into_iter().collect(),
        )]))
    }

    /// An OR grouping
    pub fn any(specs: impl IntoIterator<Item = RuleSpec>) -> Self {
        RuleSpec::Logical(BTreeMap::from([(
            LogicalOperator::Or,
            specs.into_iter().collect(),
        )]))
    }

    /// A NOT grouping over a single spec
    pub fn negate(spec: RuleSpec) -> Self {
        RuleSpec::Logical(BTreeMap::from([(LogicalOperator::Not, vec![spec])]))
    }
}

impl From<&str> for RuleSpec {
    fn from(text: &str) -> Self {
        RuleSpec::phrase(text)
    }
}

/// The compiled validator set for one declared field
pub struct FieldValidator {
    name: String,
    field_type: FieldTypeId,
    is_optional: bool,
    rules: Vec<ProcessedRule>,
    validators: Vec<Validator>,
}

impl FieldValidator {
    /// The field's declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field's declared type
    pub fn field_type(&self) -> &FieldTypeId {
        &self.field_type
    }

    /// Whether an absent value is accepted without running any predicate
    pub fn is_optional(&self) -> bool {
        self.is_optional
    }

    /// The resolved rules, in declaration order
    pub fn rules(&self) -> &[ProcessedRule] {
        &self.rules
    }

    /// Validate a value: optional fields accept null outright; otherwise
    /// predicates run in declaration order and the first failure is returned
    pub fn validate(&self, value: &Value) -> std::result::Result<(), ValidationFailure> {
        if self.is_optional && value.is_null() {
            return Ok(());
        }
        for validator in &self.validators {
            validator(value)?;
        }
        Ok(())
    }

    /// Lossless description of every resolved rule, reference parameters
    /// rendered back to their `$values.key` form
    pub fn describe(&self) -> Vec<RuleDescription> {
        self.rules.iter().map(ProcessedRule::describe).collect()
    }
}

impl std::fmt::Debug for FieldValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldValidator")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("is_optional", &self.is_optional)
            .field("rules", &self.rules.len())
            .finish()
    }
}

/// Build the compiled validator for one declared field.
///
/// Each spec is resolved independently against the field's declared type
/// (self first, then ancestors); logical groupings are resolved recursively.
/// This is the single entry point the contract-assembly layer uses per field.
pub fn build_field_validator(
    registry: &RuleRegistry,
    field_type: impl Into<FieldTypeId>,
    field_name: impl Into<String>,
    specs: &[RuleSpec],
    values: &ValueTable,
) -> Result<FieldValidator> {
    let field_type = field_type.into();
    let field_name = field_name.into();
    let resolver = RuleResolver::new(registry);
    let mut builder = FieldValidatorBuilder {
        resolver,
        field_type: field_type.clone(),
        values,
        match_cache: HashMap::new(),
    };

    let rules: Vec<ProcessedRule> = specs
        .iter()
        .map(|spec| builder.process(spec))
        .collect::<Result<_>>()?;

    let mut field = FieldInstance::new(field_name, field_type);
    let mut validators = Vec::with_capacity(rules.len());
    for rule in &rules {
        validators.push(rule.build_validator(registry, &mut field)?);
    }
    debug!(
        field = %field.name,
        field_type = %field.field_type,
        rules = rules.len(),
        is_optional = field.is_optional,
        "Built field validator"
    );
    Ok(FieldValidator {
        name: field.name,
        field_type: field.field_type,
        is_optional: field.is_optional,
        rules,
        validators,
    })
}

struct FieldValidatorBuilder<'r> {
    resolver: RuleResolver<'r>,
    field_type: FieldTypeId,
    values: &'r ValueTable,
    // memoizes phrase resolution within one field build
    match_cache: HashMap<String, MatchedRule>,
}

impl FieldValidatorBuilder<'_> {
    fn process(&mut self, spec: &RuleSpec) -> Result<ProcessedRule> {
        match spec {
            RuleSpec::Phrase(phrase) => Ok(ProcessedRule::Matched(self.match_phrase(phrase)?)),
            RuleSpec::Logical(grouping) => {
                let mut entries = grouping.iter();
                let (operator, children) = entries.next().map(|(op, specs)| (*op, specs)).ok_or_else(
                    || {
                        ContractError::MalformedLogicalRule(
                            "a logical rule must have exactly one operator key, found none"
                                .to_string(),
                        )
                    },
                )?;
                if entries.next().is_some() {
                    return Err(ContractError::MalformedLogicalRule(format!(
                        "a logical rule must have exactly one operator key, found {}",
                        grouping.len()
                    )));
                }
                let rules: Vec<ProcessedRule> = children
                    .iter()
                    .map(|child| self.process(child))
                    .collect::<Result<_>>()?;
                Ok(ProcessedRule::Logical(LogicalRule::new(operator, rules)?))
            }
        }
    }

    fn match_phrase(&mut self, phrase: &str) -> Result<MatchedRule> {
        if let Some(cached) = self.match_cache.get(phrase) {
            return Ok(cached.clone());
        }
        let rule = self
            .resolver
            .resolve(&self.field_type, phrase, self.values)?;
        self.match_cache.insert(phrase.to_string(), rule.clone());
        Ok(rule)
    }
}
