//! Logical composition of resolved rules under AND / OR / NOT
//!
//! Children are always evaluated exhaustively (no short-circuiting) so that
//! composite failures carry the complete picture of child messages.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ContractError, Result, ValidationFailure};
use crate::field::{FieldInstance, Validator};
use crate::matched::{MatchedRule, MatchedRuleDescription};
use crate::registry::RuleRegistry;

/// Logical operators available for rule composition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    /// Every child must pass
    And,
    /// At least one child must pass
    Or,
    /// The single child must fail
    Not,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "AND"),
            LogicalOperator::Or => write!(f, "OR"),
            LogicalOperator::Not => write!(f, "NOT"),
        }
    }
}

/// A resolved rule: either a single matched rule or a logical combination
#[derive(Debug, Clone)]
pub enum ProcessedRule {
    /// One rule phrase bound to one template
    Matched(MatchedRule),
    /// An AND / OR / NOT combination of nested rules
    Logical(LogicalRule),
}

/// Serializable description of a processed rule; logical nodes serialize as
/// a one-key operator map, mirroring the rule-spec input shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RuleDescription {
    /// Description of a single matched rule
    Matched(MatchedRuleDescription),
    /// Operator mapped to the ordered child descriptions
    Logical(BTreeMap<LogicalOperator, Vec<RuleDescription>>),
}

impl ProcessedRule {
    /// Build the predicate for a field instance, recursively for logical
    /// combinations
    pub fn build_validator(
        &self,
        registry: &RuleRegistry,
        field: &mut FieldInstance,
    ) -> Result<Validator> {
        match self {
            ProcessedRule::Matched(rule) => rule.build_validator(registry, field),
            ProcessedRule::Logical(rule) => rule.build_validator(registry, field),
        }
    }

    /// Describe this rule for serialization and round-tripping
    pub fn describe(&self) -> RuleDescription {
        match self {
            ProcessedRule::Matched(rule) => RuleDescription::Matched(rule.describe()),
            ProcessedRule::Logical(rule) => rule.describe(),
        }
    }
}

/// An operator applied to an ordered sequence of processed rules
#[derive(Debug, Clone)]
pub struct LogicalRule {
    operator: LogicalOperator,
    rules: Vec<ProcessedRule>,
}

impl LogicalRule {
    /// Combine rules under an operator.
    ///
    /// NOT takes exactly one child; AND and OR take at least one.
    pub fn new(operator: LogicalOperator, rules: Vec<ProcessedRule>) -> Result<Self> {
        if rules.is_empty() {
            return Err(ContractError::MalformedLogicalRule(
                "logical rules must have at least one rule".to_string(),
            ));
        }
        if operator == LogicalOperator::Not && rules.len() != 1 {
            return Err(ContractError::MalformedLogicalRule(format!(
                "NOT operator can only contain one rule, contains {}",
                rules.len()
            )));
        }
        Ok(Self { operator, rules })
    }

    /// The operator of this combination
    pub fn operator(&self) -> LogicalOperator {
        self.operator
    }

    /// The ordered child rules
    pub fn rules(&self) -> &[ProcessedRule] {
        &self.rules
    }

    /// Build the composite predicate.
    ///
    /// Child validators are built eagerly, so nested rules with build-time
    /// side effects (optionality flips) take effect even under NOT.
    pub fn build_validator(
        &self,
        registry: &RuleRegistry,
        field: &mut FieldInstance,
    ) -> Result<Validator> {
        let mut children = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            children.push(rule.build_validator(registry, field)?);
        }
        Ok(match self.operator {
            LogicalOperator::And => and_validator(children),
            LogicalOperator::Or => or_validator(children),
            // arity checked at construction
            LogicalOperator::Not => not_validator(children.remove(0)),
        })
    }

    /// Describe this combination as a one-key operator map
    pub fn describe(&self) -> RuleDescription {
        RuleDescription::Logical(BTreeMap::from([(
            self.operator,
            self.rules.iter().map(ProcessedRule::describe).collect(),
        )]))
    }
}

fn and_validator(children: Vec<Validator>) -> Validator {
    Box::new(move |value| {
        let failures: Vec<String> = children
            .iter()
            .filter_map(|child| child(value).err().map(|e| e.to_string()))
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure::LogicalAndFailed(failures))
        }
    })
}

fn or_validator(children: Vec<Validator>) -> Validator {
    Box::new(move |value| {
        let mut failures = Vec::with_capacity(children.len());
        let mut passed = false;
        for child in &children {
            match child(value) {
                Ok(()) => passed = true,
                Err(e) => failures.push(e.to_string()),
            }
        }
        if passed {
            Ok(())
        } else {
            Err(ValidationFailure::LogicalOrFailed(failures))
        }
    })
}

fn not_validator(child: Validator) -> Validator {
    Box::new(move |value| match child(value) {
        Ok(()) => Err(ValidationFailure::NegationViolated),
        Err(_) => Ok(()),
    })
}
