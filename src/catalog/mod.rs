//! Built-in field types and their rule templates
//!
//! The catalog covers the stock hierarchy: `BaseField` at the root,
//! `StringField` and `NumericField` under it, and `IntegerField` and
//! `FloatField` under `NumericField`. [`builtin_registry`] registers the
//! whole catalog and returns the registry already frozen; callers that want
//! to add their own types build an unfrozen registry by hand instead.

use crate::error::{Result, ValidationFailure};
use crate::registry::RuleRegistry;
use crate::value::Value;

pub mod base;
pub mod numeric;
pub mod string;

/// Root of the built-in field-type hierarchy
pub const BASE_FIELD: &str = "BaseField";
/// String-valued fields
pub const STRING_FIELD: &str = "StringField";
/// Numeric fields, integer or float
pub const NUMERIC_FIELD: &str = "NumericField";
/// Integer-valued fields
pub const INTEGER_FIELD: &str = "IntegerField";
/// Float-valued fields
pub const FLOAT_FIELD: &str = "FloatField";

/// Build a frozen registry holding the complete built-in catalog
pub fn builtin_registry() -> Result<RuleRegistry> {
    let mut registry = RuleRegistry::new();
    registry.register_field(BASE_FIELD, Vec::<&str>::new())?;
    registry.register_field(STRING_FIELD, [BASE_FIELD])?;
    registry.register_field(NUMERIC_FIELD, [BASE_FIELD])?;
    registry.register_field(INTEGER_FIELD, [NUMERIC_FIELD])?;
    registry.register_field(FLOAT_FIELD, [NUMERIC_FIELD])?;

    base::register(&mut registry)?;
    string::register(&mut registry)?;
    numeric::register(&mut registry)?;

    registry.freeze();
    Ok(registry)
}

pub(crate) fn expect_str(value: &Value) -> std::result::Result<&str, ValidationFailure> {
    value
        .as_str()
        .ok_or_else(|| ValidationFailure::message("Value must be a string."))
}

pub(crate) fn expect_number(value: &Value) -> std::result::Result<f64, ValidationFailure> {
    value
        .as_number()
        .ok_or_else(|| ValidationFailure::message("Value must be a number."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FieldTypeId;

    #[test]
    fn test_builtin_registry_hierarchy() {
        let registry = builtin_registry().unwrap();
        assert!(registry.is_frozen());
        assert_eq!(
            registry.ancestors(&FieldTypeId::from(INTEGER_FIELD)).unwrap(),
            vec![
                FieldTypeId::from(NUMERIC_FIELD),
                FieldTypeId::from(BASE_FIELD),
            ]
        );
        assert_eq!(
            registry.ancestors(&FieldTypeId::from(FLOAT_FIELD)).unwrap(),
            vec![
                FieldTypeId::from(NUMERIC_FIELD),
                FieldTypeId::from(BASE_FIELD),
            ]
        );
        assert_eq!(
            registry.ancestors(&FieldTypeId::from(STRING_FIELD)).unwrap(),
            vec![FieldTypeId::from(BASE_FIELD)]
        );
    }

    #[test]
    fn test_builtin_registry_declares_rules() {
        let registry = builtin_registry().unwrap();
        assert!(!registry.rules_for(&FieldTypeId::from(BASE_FIELD)).is_empty());
        assert!(!registry.rules_for(&FieldTypeId::from(STRING_FIELD)).is_empty());
        assert!(!registry.rules_for(&FieldTypeId::from(NUMERIC_FIELD)).is_empty());
        assert!(!registry.rules_for(&FieldTypeId::from(FLOAT_FIELD)).is_empty());
    }
}
