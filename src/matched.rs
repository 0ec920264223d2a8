//! A matched rule: the concrete binding of one raw phrase to one template
//!
//! Holds the literal captured values and the reference tokens exactly as the
//! alias matcher produced them; references are resolved against the
//! contract's value table once, on first use, and the result is cached for
//! the lifetime of the matched rule.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::error::{ContractError, Result};
use crate::field::{FieldInstance, Validator};
use crate::pattern::CapturedParam;
use crate::registry::{FieldTypeId, RuleArgs, RuleRegistry, RuleTemplate};
use crate::value::{Value, ValueTable};

/// The resolved binding of one raw rule phrase to one rule template
#[derive(Debug, Clone)]
pub struct MatchedRule {
    template: Arc<RuleTemplate>,
    phrase: String,
    captured: BTreeMap<String, CapturedParam>,
    values: ValueTable,
    resolved: OnceLock<BTreeMap<String, Value>>,
}

/// Lossless, serializable description of a matched rule. Reference
/// parameters are rendered back to their `$values.key` form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedRuleDescription {
    /// The alias pattern text
    pub rule: String,
    /// The raw phrase as authored in the contract
    pub parsed_rule: String,
    /// Placeholder name to parameter type name
    pub rule_params: BTreeMap<String, String>,
    /// Captured parameters in their original textual form
    pub parsed_values: BTreeMap<String, Value>,
}

impl MatchedRule {
    /// Bind a template to a phrase with its captured parameters.
    ///
    /// The captured keys must exactly equal the template's placeholder
    /// names; a mismatch is a matcher defect surfaced as
    /// [`ContractError::ParameterMismatch`].
    pub fn new(
        template: Arc<RuleTemplate>,
        phrase: impl Into<String>,
        captured: BTreeMap<String, CapturedParam>,
        values: ValueTable,
    ) -> Result<Self> {
        let phrase = phrase.into();
        let expected: Vec<&str> = template
            .pattern()
            .params()
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        if expected.len() != captured.len()
            || !expected.iter().all(|name| captured.contains_key(*name))
        {
            return Err(ContractError::ParameterMismatch(format!(
                "captured parameters for '{phrase}' do not match the placeholders of '{}'",
                template.alias()
            )));
        }
        Ok(Self {
            template,
            phrase,
            captured,
            values,
            resolved: OnceLock::new(),
        })
    }

    /// The field type the template was declared for
    pub fn field_type(&self) -> &FieldTypeId {
        self.template.field_type()
    }

    /// The alias pattern text
    pub fn alias(&self) -> &str {
        self.template.alias()
    }

    /// The raw phrase this rule was resolved from
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Captured parameters, references still unresolved
    pub fn captured_params(&self) -> &BTreeMap<String, CapturedParam> {
        &self.captured
    }

    /// Captured parameters with every reference replaced by its value-table
    /// entry, type-checked against the placeholder's declared type.
    ///
    /// Resolution runs once; the result is cached.
    pub fn resolved_params(&self) -> Result<&BTreeMap<String, Value>> {
        if let Some(resolved) = self.resolved.get() {
            return Ok(resolved);
        }
        let resolved = self.resolve_references()?;
        Ok(self.resolved.get_or_init(|| resolved))
    }

    fn resolve_references(&self) -> Result<BTreeMap<String, Value>> {
        let mut resolved = BTreeMap::new();
        for (name, param) in &self.captured {
            let value = match param {
                CapturedParam::Literal(value) => value.clone(),
                CapturedParam::Reference(key) => {
                    let value = self
                        .values
                        .get(key)
                        .ok_or_else(|| ContractError::ReferenceNotFound(key.clone()))?;
                    // the placeholder's type is re-checked against the
                    // looked-up value, mirroring the literal grammar
                    if let Some(ty) = self.template.pattern().param_type(name) {
                        ty.check_resolved(value)?;
                    }
                    value.clone()
                }
            };
            resolved.insert(name.clone(), value);
        }
        Ok(resolved)
    }

    /// Build the predicate for a field instance.
    ///
    /// The instance's type must be the template's field type or a subtype
    /// ([`ContractError::FieldTypeMismatch`] otherwise). The factory runs
    /// with the field bound as receiver, so rules with registration-declared
    /// side effects (the "Is not null" optionality flip) take effect here.
    pub fn build_validator(
        &self,
        registry: &RuleRegistry,
        field: &mut FieldInstance,
    ) -> Result<Validator> {
        if !registry.is_subtype(&field.field_type, self.template.field_type())? {
            return Err(ContractError::FieldTypeMismatch {
                expected: self.template.field_type().clone(),
                found: field.field_type.clone(),
            });
        }
        let mut params = self.template.fixed_params().clone();
        for (name, value) in self.resolved_params()? {
            params.insert(name.clone(), value.clone());
        }
        (self.template.factory().build)(field, &RuleArgs::new(params))
    }

    /// Describe this rule for serialization and round-tripping
    pub fn describe(&self) -> MatchedRuleDescription {
        MatchedRuleDescription {
            rule: self.template.alias().to_string(),
            parsed_rule: self.phrase.clone(),
            rule_params: self
                .template
                .pattern()
                .params()
                .iter()
                .map(|(name, ty)| (name.clone(), ty.name().to_string()))
                .collect(),
            parsed_values: self
                .captured
                .iter()
                .map(|(name, param)| (name.clone(), param.to_display_value()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationFailure;
    use crate::registry::{RuleFactory, RuleRegistry};

    fn test_registry() -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        registry.register_field("TestField", Vec::<&str>::new()).unwrap();
        registry.register_field("SubField", ["TestField"]).unwrap();
        registry.register_field("OtherField", Vec::<&str>::new()).unwrap();
        registry
            .register_rule(
                "TestField",
                "Test rule with {param:Integer}",
                RuleFactory {
                    params: &["field", "param"],
                    build: |_field, args| {
                        let param = args.int("param")?;
                        Ok(Box::new(move |value| {
                            if value.as_number() == Some(param as f64) {
                                Ok(())
                            } else {
                                Err(ValidationFailure::message("wrong value"))
                            }
                        }))
                    },
                },
                BTreeMap::new(),
            )
            .unwrap();
        registry.freeze();
        registry
    }

    fn matched(registry: &RuleRegistry, phrase: &str, values: ValueTable) -> MatchedRule {
        let template = registry.rules_for(&"TestField".into())[0].clone();
        let captured = template
            .pattern()
            .match_phrase(phrase)
            .unwrap()
            .expect("phrase should match");
        MatchedRule::new(template, phrase, captured, values).unwrap()
    }

    #[test]
    fn test_resolved_params_literal() {
        let registry = test_registry();
        let rule = matched(&registry, "Test rule with 42", ValueTable::new());
        assert_eq!(
            rule.resolved_params().unwrap(),
            &BTreeMap::from([("param".to_string(), Value::Int(42))])
        );
    }

    #[test]
    fn test_resolved_params_reference() {
        let registry = test_registry();
        let values = ValueTable::new().with("limit", 7_i64);
        let rule = matched(&registry, "Test rule with $values.limit", values);
        assert_eq!(
            rule.resolved_params().unwrap(),
            &BTreeMap::from([("param".to_string(), Value::Int(7))])
        );
    }

    #[test]
    fn test_resolved_params_reference_not_found() {
        let registry = test_registry();
        let rule = matched(&registry, "Test rule with $values.missing", ValueTable::new());
        assert_eq!(
            rule.resolved_params().unwrap_err(),
            ContractError::ReferenceNotFound("missing".to_string())
        );
    }

    #[test]
    fn test_resolved_params_incompatible_reference() {
        let registry = test_registry();
        let values = ValueTable::new().with("limit", "not_a_number");
        let rule = matched(&registry, "Test rule with $values.limit", values);
        assert!(matches!(
            rule.resolved_params().unwrap_err(),
            ContractError::IncompatibleElementType { .. }
        ));
    }

    #[test]
    fn test_build_validator_binds_params() {
        let registry = test_registry();
        let rule = matched(&registry, "Test rule with 42", ValueTable::new());
        let mut field = FieldInstance::new("f", "TestField");
        let validator = rule.build_validator(&registry, &mut field).unwrap();
        assert!(validator(&Value::Int(42)).is_ok());
        assert!(validator(&Value::Int(41)).is_err());
    }

    #[test]
    fn test_build_validator_accepts_subtype() {
        let registry = test_registry();
        let rule = matched(&registry, "Test rule with 1", ValueTable::new());
        let mut field = FieldInstance::new("f", "SubField");
        assert!(rule.build_validator(&registry, &mut field).is_ok());
    }

    #[test]
    fn test_build_validator_type_mismatch() {
        let registry = test_registry();
        let rule = matched(&registry, "Test rule with 1", ValueTable::new());
        let mut field = FieldInstance::new("f", "OtherField");
        assert!(matches!(
            rule.build_validator(&registry, &mut field).err().unwrap(),
            ContractError::FieldTypeMismatch { .. }
        ));
    }

    #[test]
    fn test_describe_renders_references() {
        let registry = test_registry();
        let values = ValueTable::new().with("limit", 7_i64);
        let rule = matched(&registry, "Test rule with $values.limit", values);
        let description = rule.describe();
        assert_eq!(description.rule, "Test rule with {param:Integer}");
        assert_eq!(description.parsed_rule, "Test rule with $values.limit");
        assert_eq!(description.rule_params["param"], "Integer");
        assert_eq!(
            description.parsed_values["param"],
            Value::Str("$values.limit".to_string())
        );
    }
}
