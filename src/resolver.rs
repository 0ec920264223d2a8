//! Rule resolution: from a raw phrase to exactly one matched rule
//!
//! Candidates are collected from the field type itself first, then from its
//! ancestors in depth-first order, declaration order within each type. Every
//! candidate is tried; anything other than exactly one match is an error.

use tracing::debug;

use crate::error::{ContractError, Result};
use crate::matched::MatchedRule;
use crate::registry::{FieldTypeId, RuleRegistry};
use crate::value::ValueTable;

/// Resolves raw rule phrases against a (frozen) rule registry
#[derive(Debug, Clone, Copy)]
pub struct RuleResolver<'r> {
    registry: &'r RuleRegistry,
}

impl<'r> RuleResolver<'r> {
    /// Create a resolver over a registry
    pub fn new(registry: &'r RuleRegistry) -> Self {
        Self { registry }
    }

    /// The registry this resolver reads from
    pub fn registry(&self) -> &'r RuleRegistry {
        self.registry
    }

    /// Resolve a raw rule phrase for a field type.
    ///
    /// Zero matching templates fail with [`ContractError::RuleNotFound`];
    /// more than one is a registry-authoring defect surfaced as
    /// [`ContractError::AmbiguousRuleSolution`] — never tie-broken.
    pub fn resolve(
        &self,
        field_type: &FieldTypeId,
        phrase: &str,
        values: &ValueTable,
    ) -> Result<MatchedRule> {
        if !self.registry.contains_type(field_type) {
            return Err(ContractError::UnknownFieldType(field_type.clone()));
        }
        let ancestors = self.registry.ancestors(field_type)?;
        let mut searched = vec![field_type.clone()];
        searched.extend(ancestors);

        let mut matches = Vec::new();
        for candidate_type in &searched {
            for template in self.registry.rules_for(candidate_type) {
                if let Some(captured) = template.pattern().match_phrase(phrase)? {
                    matches.push((template.clone(), captured));
                }
            }
        }

        match matches.len() {
            0 => Err(ContractError::RuleNotFound {
                field_type: field_type.clone(),
                phrase: phrase.to_string(),
                searched,
            }),
            1 => {
                // matches holds exactly one element
                let (template, captured) = matches.remove(0);
                debug!(field_type = %field_type, phrase, alias = template.alias(), "Resolved rule");
                MatchedRule::new(template, phrase, captured, values.clone())
            }
            _ => Err(ContractError::AmbiguousRuleSolution {
                field_type: field_type.clone(),
                phrase: phrase.to_string(),
                candidates: matches
                    .iter()
                    .map(|(template, _)| template.alias().to_string())
                    .collect(),
            }),
        }
    }
}
