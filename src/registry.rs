//! Field-type hierarchy and rule registry
//!
//! The registry records field types (an explicit DAG of declared parents)
//! and the ordered rule templates declared directly for each type. It has a
//! documented two-phase lifecycle: a build phase during which
//! [`RuleRegistry::register_field`] and [`RuleRegistry::register_rule`] are
//! called, strictly followed by a frozen, read-only phase in which contract
//! builds resolve against it. Mutation after [`RuleRegistry::freeze`] is an
//! error; resolution never mutates.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ContractError, Result};
use crate::field::{FieldInstance, Validator};
use crate::pattern::AliasPattern;
use crate::value::Value;

/// Name of the implicit field-instance receiver a validator factory must
/// declare as its first parameter
pub const RECEIVER_PARAM: &str = "field";

/// A unique name identifying a field type (e.g. "StringField")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTypeId(String);

impl FieldTypeId {
    /// Create a field type id
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The type name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldTypeId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for FieldTypeId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// The resolved parameter bundle handed to a validator factory: fixed
/// (pre-bound) parameters merged with the matched, reference-resolved ones.
#[derive(Debug, Clone, Default)]
pub struct RuleArgs {
    params: BTreeMap<String, Value>,
}

impl RuleArgs {
    /// Wrap a parameter map
    pub fn new(params: BTreeMap<String, Value>) -> Self {
        Self { params }
    }

    /// Look up a raw parameter value
    pub fn value(&self, name: &str) -> Result<&Value> {
        self.params.get(name).ok_or_else(|| {
            ContractError::ParameterMismatch(format!("missing rule parameter '{name}'"))
        })
    }

    /// An integer parameter
    pub fn int(&self, name: &str) -> Result<i64> {
        self.value(name)?.as_int().ok_or_else(|| {
            ContractError::ParameterMismatch(format!("parameter '{name}' is not an integer"))
        })
    }

    /// A numeric parameter (integer or float)
    pub fn number(&self, name: &str) -> Result<f64> {
        self.value(name)?.as_number().ok_or_else(|| {
            ContractError::ParameterMismatch(format!("parameter '{name}' is not a number"))
        })
    }

    /// A string parameter
    pub fn str(&self, name: &str) -> Result<&str> {
        self.value(name)?.as_str().ok_or_else(|| {
            ContractError::ParameterMismatch(format!("parameter '{name}' is not a string"))
        })
    }

    /// A boolean parameter (only ever supplied through fixed params)
    pub fn bool(&self, name: &str) -> Result<bool> {
        match self.value(name)? {
            Value::Bool(b) => Ok(*b),
            _ => Err(ContractError::ParameterMismatch(format!(
                "parameter '{name}' is not a boolean"
            ))),
        }
    }

    /// A string-array parameter
    pub fn str_list(&self, name: &str) -> Result<Vec<String>> {
        let items = self.value(name)?.as_list().ok_or_else(|| {
            ContractError::ParameterMismatch(format!("parameter '{name}' is not an array"))
        })?;
        items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    ContractError::ParameterMismatch(format!(
                        "parameter '{name}' is not a string array"
                    ))
                })
            })
            .collect()
    }
}

/// A validator factory function: binds the field instance as receiver and
/// the merged parameters, returning the compiled predicate
pub type FactoryFn = fn(&mut FieldInstance, &RuleArgs) -> Result<Validator>;

/// A validator factory together with its explicitly declared parameter
/// names. The first declared name must be the [`RECEIVER_PARAM`] receiver;
/// the rest must exactly equal the alias placeholders plus fixed-parameter
/// keys of the template the factory is registered under.
#[derive(Clone, Copy)]
pub struct RuleFactory {
    /// Declared parameter names, receiver first
    pub params: &'static [&'static str],
    /// The factory function
    pub build: FactoryFn,
}

impl fmt::Debug for RuleFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleFactory")
            .field("params", &self.params)
            .finish()
    }
}

/// A rule template: an alias pattern bound to a validator factory for one
/// field type, with optional fixed (pre-bound) parameters
#[derive(Debug)]
pub struct RuleTemplate {
    field_type: FieldTypeId,
    pattern: AliasPattern,
    fixed_params: BTreeMap<String, Value>,
    factory: RuleFactory,
}

impl RuleTemplate {
    /// The field type this template is declared for
    pub fn field_type(&self) -> &FieldTypeId {
        &self.field_type
    }

    /// The compiled alias pattern
    pub fn pattern(&self) -> &AliasPattern {
        &self.pattern
    }

    /// The alias text
    pub fn alias(&self) -> &str {
        self.pattern.alias()
    }

    /// The fixed parameters bound at registration
    pub fn fixed_params(&self) -> &BTreeMap<String, Value> {
        &self.fixed_params
    }

    /// The validator factory
    pub fn factory(&self) -> &RuleFactory {
        &self.factory
    }
}

/// Introspective description of one registered field type
#[derive(Debug, Clone, Serialize)]
pub struct TypeDefinition {
    /// The field type
    pub field_type: FieldTypeId,
    /// Immediate declared parents
    pub parents: Vec<FieldTypeId>,
    /// Full ancestor chain in resolution order
    pub ancestors: Vec<FieldTypeId>,
    /// Aliases of the templates declared directly for this type
    pub rules: Vec<String>,
}

/// Process-wide registry of field types and rule templates
#[derive(Debug, Default)]
pub struct RuleRegistry {
    parents: HashMap<FieldTypeId, Vec<FieldTypeId>>,
    rules: HashMap<FieldTypeId, Vec<Arc<RuleTemplate>>>,
    // registration order, for deterministic introspection output
    type_order: Vec<FieldTypeId>,
    frozen: bool,
}

impl RuleRegistry {
    /// Create an empty, unfrozen registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field type and its declared parents.
    ///
    /// Re-registering a type overwrites its parents (last write wins).
    pub fn register_field<I, P>(&mut self, field_type: impl Into<FieldTypeId>, parents: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: Into<FieldTypeId>,
    {
        self.ensure_unfrozen()?;
        let field_type = field_type.into();
        let parents: Vec<FieldTypeId> = parents.into_iter().map(Into::into).collect();
        debug!(field_type = %field_type, ?parents, "Registering field type");
        if !self.parents.contains_key(&field_type) {
            self.type_order.push(field_type.clone());
        }
        self.parents.insert(field_type, parents);
        Ok(())
    }

    /// Register a rule template for a field type.
    ///
    /// Validates at registration time that the factory declares the field
    /// receiver first ([`ContractError::NotAFieldMethod`]) and that the alias
    /// placeholders plus fixed-parameter keys exactly equal the factory's
    /// remaining declared parameters ([`ContractError::ParameterMismatch`]).
    pub fn register_rule(
        &mut self,
        field_type: impl Into<FieldTypeId>,
        alias: &str,
        factory: RuleFactory,
        fixed_params: BTreeMap<String, Value>,
    ) -> Result<()> {
        self.ensure_unfrozen()?;
        let field_type = field_type.into();
        if !self.parents.contains_key(&field_type) {
            return Err(ContractError::UnknownFieldType(field_type));
        }
        let pattern = AliasPattern::compile(alias)?;
        validate_factory_params(alias, &pattern, &factory, &fixed_params)?;
        debug!(field_type = %field_type, alias, "Registering rule template");
        let template = Arc::new(RuleTemplate {
            field_type: field_type.clone(),
            pattern,
            fixed_params,
            factory,
        });
        self.rules.entry(field_type).or_default().push(template);
        Ok(())
    }

    /// Enter the read-only phase; registration calls fail afterwards
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Whether the registry has been frozen
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether a field type is registered
    pub fn contains_type(&self, field_type: &FieldTypeId) -> bool {
        self.parents.contains_key(field_type)
    }

    /// Templates declared directly for a field type (ancestor lookup is the
    /// resolver's job)
    pub fn rules_for(&self, field_type: &FieldTypeId) -> &[Arc<RuleTemplate>] {
        self.rules
            .get(field_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Ancestors of a field type: depth-first, parents before grandparents,
    /// first occurrence wins, the type itself excluded.
    ///
    /// Fails fast with [`ContractError::CycleDetected`] instead of looping on
    /// a cyclic type graph.
    pub fn ancestors(&self, field_type: &FieldTypeId) -> Result<Vec<FieldTypeId>> {
        let mut collected = Vec::new();
        let mut path = vec![field_type.clone()];
        self.collect_ancestors(field_type, &mut collected, &mut path)?;
        Ok(collected)
    }

    fn collect_ancestors(
        &self,
        field_type: &FieldTypeId,
        collected: &mut Vec<FieldTypeId>,
        path: &mut Vec<FieldTypeId>,
    ) -> Result<()> {
        let Some(parents) = self.parents.get(field_type) else {
            return Ok(());
        };
        for parent in parents {
            if path.contains(parent) {
                return Err(ContractError::CycleDetected(parent.clone()));
            }
            if !collected.contains(parent) {
                collected.push(parent.clone());
            }
            path.push(parent.clone());
            self.collect_ancestors(parent, collected, path)?;
            path.pop();
        }
        Ok(())
    }

    /// Whether `field_type` is `target` or one of its descendants
    pub fn is_subtype(&self, field_type: &FieldTypeId, target: &FieldTypeId) -> Result<bool> {
        if field_type == target {
            return Ok(true);
        }
        Ok(self.ancestors(field_type)?.contains(target))
    }

    /// Introspection over every registered type: parents, ancestor chain,
    /// and directly declared rule aliases, in registration order
    pub fn type_definitions(&self) -> Result<Vec<TypeDefinition>> {
        self.type_order
            .iter()
            .map(|field_type| {
                Ok(TypeDefinition {
                    field_type: field_type.clone(),
                    parents: self.parents.get(field_type).cloned().unwrap_or_default(),
                    ancestors: self.ancestors(field_type)?,
                    rules: self
                        .rules_for(field_type)
                        .iter()
                        .map(|t| t.alias().to_string())
                        .collect(),
                })
            })
            .collect()
    }

    fn ensure_unfrozen(&self) -> Result<()> {
        if self.frozen {
            Err(ContractError::RegistryFrozen)
        } else {
            Ok(())
        }
    }
}

fn validate_factory_params(
    alias: &str,
    pattern: &AliasPattern,
    factory: &RuleFactory,
    fixed_params: &BTreeMap<String, Value>,
) -> Result<()> {
    let mut declared = factory.params.iter();
    if declared.next() != Some(&RECEIVER_PARAM) {
        return Err(ContractError::NotAFieldMethod(format!(
            "factory for alias '{alias}' does not declare the '{RECEIVER_PARAM}' receiver first"
        )));
    }
    let declared: Vec<&str> = declared.copied().collect();

    for fixed in fixed_params.keys() {
        if !declared.iter().any(|p| p == fixed) {
            return Err(ContractError::ParameterMismatch(format!(
                "the fixed parameter '{fixed}' is not declared by the factory for alias '{alias}'"
            )));
        }
        if pattern.param_type(fixed).is_some() {
            return Err(ContractError::ParameterMismatch(format!(
                "the fixed parameter '{fixed}' collides with a placeholder in alias '{alias}'"
            )));
        }
    }

    let mut expected: Vec<&str> = pattern
        .params()
        .iter()
        .map(|(name, _)| name.as_str())
        .chain(fixed_params.keys().map(String::as_str))
        .collect();
    expected.sort_unstable();
    let mut actual = declared.clone();
    actual.sort_unstable();
    if expected != actual {
        return Err(ContractError::ParameterMismatch(format!(
            "alias '{alias}' supplies parameters {expected:?} but the factory declares {actual:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationFailure;

    fn noop(_field: &mut FieldInstance, _args: &RuleArgs) -> Result<Validator> {
        Ok(Box::new(|_| Ok(())))
    }

    fn with_param(_field: &mut FieldInstance, args: &RuleArgs) -> Result<Validator> {
        let min = args.int("param")?;
        Ok(Box::new(move |value| {
            if value.as_number().unwrap_or(f64::MIN) >= min as f64 {
                Ok(())
            } else {
                Err(ValidationFailure::message("too small"))
            }
        }))
    }

    #[test]
    fn test_register_field_and_rule() {
        let mut registry = RuleRegistry::new();
        registry.register_field("TestField", Vec::<&str>::new()).unwrap();
        registry
            .register_rule(
                "TestField",
                "Test rule with {param:Integer}",
                RuleFactory { params: &["field", "param"], build: with_param },
                BTreeMap::new(),
            )
            .unwrap();
        let rules = registry.rules_for(&FieldTypeId::from("TestField"));
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].alias(), "Test rule with {param:Integer}");
    }

    #[test]
    fn test_register_rule_unknown_field() {
        let mut registry = RuleRegistry::new();
        let err = registry
            .register_rule(
                "Missing",
                "Anything",
                RuleFactory { params: &["field"], build: noop },
                BTreeMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, ContractError::UnknownFieldType(_)));
    }

    #[test]
    fn test_register_rule_without_receiver() {
        let mut registry = RuleRegistry::new();
        registry.register_field("TestField", Vec::<&str>::new()).unwrap();
        let err = registry
            .register_rule(
                "TestField",
                "Test rule with {param:Integer}",
                RuleFactory { params: &["param"], build: with_param },
                BTreeMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, ContractError::NotAFieldMethod(_)));
    }

    #[test]
    fn test_register_rule_param_mismatch() {
        let mut registry = RuleRegistry::new();
        registry.register_field("TestField", Vec::<&str>::new()).unwrap();
        let err = registry
            .register_rule(
                "TestField",
                "Test rule with {param:Integer}",
                RuleFactory { params: &["field", "wrong_name"], build: with_param },
                BTreeMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, ContractError::ParameterMismatch(_)));
    }

    #[test]
    fn test_register_rule_fixed_param_not_declared() {
        let mut registry = RuleRegistry::new();
        registry.register_field("TestField", Vec::<&str>::new()).unwrap();
        let err = registry
            .register_rule(
                "TestField",
                "Test rule with {param:Integer}",
                RuleFactory { params: &["field", "param"], build: with_param },
                BTreeMap::from([("not_a_param".to_string(), Value::Int(1))]),
            )
            .unwrap_err();
        assert!(matches!(err, ContractError::ParameterMismatch(_)));
    }

    #[test]
    fn test_fixed_params_complete_the_declared_set() {
        let mut registry = RuleRegistry::new();
        registry.register_field("TestField", Vec::<&str>::new()).unwrap();
        fn three(_field: &mut FieldInstance, _args: &RuleArgs) -> Result<Validator> {
            Ok(Box::new(|_| Ok(())))
        }
        registry
            .register_rule(
                "TestField",
                "Test with {param1:Integer}",
                RuleFactory { params: &["field", "param1", "param2", "param3"], build: three },
                BTreeMap::from([
                    ("param2".to_string(), Value::Str("fixed2".into())),
                    ("param3".to_string(), Value::Str("fixed3".into())),
                ]),
            )
            .unwrap();
    }

    #[test]
    fn test_ancestors_depth_first_first_wins() {
        let mut registry = RuleRegistry::new();
        registry.register_field("BaseField", Vec::<&str>::new()).unwrap();
        registry.register_field("NumericField", ["BaseField"]).unwrap();
        registry.register_field("IntegerField", ["NumericField"]).unwrap();
        let ancestors = registry
            .ancestors(&FieldTypeId::from("IntegerField"))
            .unwrap();
        assert_eq!(
            ancestors,
            vec![FieldTypeId::from("NumericField"), FieldTypeId::from("BaseField")]
        );
    }

    #[test]
    fn test_ancestors_multi_parent_dedup() {
        let mut registry = RuleRegistry::new();
        registry.register_field("BaseField", Vec::<&str>::new()).unwrap();
        registry.register_field("A", ["BaseField"]).unwrap();
        registry.register_field("B", ["BaseField"]).unwrap();
        registry.register_field("C", ["A", "B"]).unwrap();
        let ancestors = registry.ancestors(&FieldTypeId::from("C")).unwrap();
        assert_eq!(
            ancestors,
            vec![
                FieldTypeId::from("A"),
                FieldTypeId::from("BaseField"),
                FieldTypeId::from("B"),
            ]
        );
    }

    #[test]
    fn test_cycle_detected() {
        let mut registry = RuleRegistry::new();
        registry.register_field("A", ["B"]).unwrap();
        registry.register_field("B", ["A"]).unwrap();
        let err = registry.ancestors(&FieldTypeId::from("A")).unwrap_err();
        assert!(matches!(err, ContractError::CycleDetected(_)));
    }

    #[test]
    fn test_frozen_registry_rejects_registration() {
        let mut registry = RuleRegistry::new();
        registry.register_field("TestField", Vec::<&str>::new()).unwrap();
        registry.freeze();
        let err = registry
            .register_field("Other", Vec::<&str>::new())
            .unwrap_err();
        assert!(matches!(err, ContractError::RegistryFrozen));
    }

    #[test]
    fn test_type_definitions() {
        let mut registry = RuleRegistry::new();
        registry.register_field("BaseField", Vec::<&str>::new()).unwrap();
        registry.register_field("NumericField", ["BaseField"]).unwrap();
        registry
            .register_rule(
                "BaseField",
                "Base rule",
                RuleFactory { params: &["field"], build: noop },
                BTreeMap::new(),
            )
            .unwrap();
        registry
            .register_rule(
                "NumericField",
                "Derived rule",
                RuleFactory { params: &["field"], build: noop },
                BTreeMap::new(),
            )
            .unwrap();

        let definitions = registry.type_definitions().unwrap();
        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions[0].field_type, FieldTypeId::from("BaseField"));
        assert_eq!(definitions[0].parents, Vec::<FieldTypeId>::new());
        assert_eq!(definitions[0].rules, vec!["Base rule"]);
        assert_eq!(definitions[1].parents, vec![FieldTypeId::from("BaseField")]);
        assert_eq!(definitions[1].rules, vec!["Derived rule"]);
    }
}
