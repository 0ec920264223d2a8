//! Rules shared by every field type

use std::collections::BTreeMap;

use crate::error::{Result, ValidationFailure};
use crate::field::{FieldInstance, Validator};
use crate::registry::{RuleArgs, RuleFactory, RuleRegistry};

use super::BASE_FIELD;

pub(super) fn register(registry: &mut RuleRegistry) -> Result<()> {
    registry.register_rule(
        BASE_FIELD,
        "Is not null",
        RuleFactory { params: &["field"], build: not_null },
        BTreeMap::new(),
    )?;
    Ok(())
}

/// Declaring this rule also marks the field as required, so null stops being
/// skipped by the optional-field short circuit
fn not_null(field: &mut FieldInstance, _args: &RuleArgs) -> Result<Validator> {
    field.is_optional = false;
    Ok(Box::new(|value| {
        if value.is_null() {
            Err(ValidationFailure::message("Value cannot be null."))
        } else {
            Ok(())
        }
    }))
}
