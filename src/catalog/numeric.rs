//! Rules for numeric fields, plus the float-only precision rule
//!
//! `IntegerField` and `FloatField` declare no extra bound rules of their own
//! beyond what they inherit from `NumericField`, except for the float
//! decimal-places limit.

use std::collections::BTreeMap;

use crate::error::{Result, ValidationFailure};
use crate::field::{FieldInstance, Validator};
use crate::registry::{RuleArgs, RuleFactory, RuleRegistry};
use crate::value::Value;

use super::{expect_number, FLOAT_FIELD, NUMERIC_FIELD};

pub(super) fn register(registry: &mut RuleRegistry) -> Result<()> {
    let rules: [(&str, RuleFactory); 7] = [
        ("Is positive", RuleFactory { params: &["field"], build: positive }),
        ("Is negative", RuleFactory { params: &["field"], build: negative }),
        ("Is not zero", RuleFactory { params: &["field"], build: not_zero }),
        (
            "Minimum {min_val:Number}",
            RuleFactory { params: &["field", "min_val"], build: minimum },
        ),
        (
            "Maximum {max_val:Number}",
            RuleFactory { params: &["field", "max_val"], build: maximum },
        ),
        (
            "Greater than {threshold:Number}",
            RuleFactory { params: &["field", "threshold"], build: greater_than },
        ),
        (
            "Less than {threshold:Number}",
            RuleFactory { params: &["field", "threshold"], build: less_than },
        ),
    ];
    for (alias, factory) in rules {
        registry.register_rule(NUMERIC_FIELD, alias, factory, BTreeMap::new())?;
    }
    let range = RuleFactory {
        params: &["field", "min_val", "max_val", "negative"],
        build: between,
    };
    registry.register_rule(
        NUMERIC_FIELD,
        "Between {min_val:Number} and {max_val:Number}",
        range,
        BTreeMap::from([("negative".to_string(), Value::Bool(false))]),
    )?;
    registry.register_rule(
        NUMERIC_FIELD,
        "Not between {min_val:Number} and {max_val:Number}",
        range,
        BTreeMap::from([("negative".to_string(), Value::Bool(true))]),
    )?;
    registry.register_rule(
        FLOAT_FIELD,
        "Has at most {decimal_places:Integer} decimal places",
        RuleFactory { params: &["field", "decimal_places"], build: max_decimal_places },
        BTreeMap::new(),
    )?;
    Ok(())
}

fn positive(_field: &mut FieldInstance, _args: &RuleArgs) -> Result<Validator> {
    Ok(Box::new(|value| {
        if expect_number(value)? > 0.0 {
            Ok(())
        } else {
            Err(ValidationFailure::message("Value must be positive."))
        }
    }))
}

fn negative(_field: &mut FieldInstance, _args: &RuleArgs) -> Result<Validator> {
    Ok(Box::new(|value| {
        if expect_number(value)? < 0.0 {
            Ok(())
        } else {
            Err(ValidationFailure::message("Value must be less than zero."))
        }
    }))
}

fn not_zero(_field: &mut FieldInstance, _args: &RuleArgs) -> Result<Validator> {
    Ok(Box::new(|value| {
        if expect_number(value)? == 0.0 {
            Err(ValidationFailure::message("Value cannot be zero."))
        } else {
            Ok(())
        }
    }))
}

fn minimum(_field: &mut FieldInstance, args: &RuleArgs) -> Result<Validator> {
    let min_val = args.number("min_val")?;
    Ok(Box::new(move |value| {
        if expect_number(value)? < min_val {
            Err(ValidationFailure::message(format!(
                "Value must be at least {min_val}."
            )))
        } else {
            Ok(())
        }
    }))
}

fn maximum(_field: &mut FieldInstance, args: &RuleArgs) -> Result<Validator> {
    let max_val = args.number("max_val")?;
    Ok(Box::new(move |value| {
        if expect_number(value)? > max_val {
            Err(ValidationFailure::message(format!(
                "Value must not exceed {max_val}."
            )))
        } else {
            Ok(())
        }
    }))
}

fn greater_than(_field: &mut FieldInstance, args: &RuleArgs) -> Result<Validator> {
    let threshold = args.number("threshold")?;
    Ok(Box::new(move |value| {
        if expect_number(value)? > threshold {
            Ok(())
        } else {
            Err(ValidationFailure::message(format!(
                "Value must be greater than {threshold}."
            )))
        }
    }))
}

fn less_than(_field: &mut FieldInstance, args: &RuleArgs) -> Result<Validator> {
    let threshold = args.number("threshold")?;
    Ok(Box::new(move |value| {
        if expect_number(value)? < threshold {
            Ok(())
        } else {
            Err(ValidationFailure::message(format!(
                "Value must be less than {threshold}."
            )))
        }
    }))
}

/// Shared by the "Between" and "Not between" aliases; the fixed `negative`
/// parameter picks the side. Bounds are inclusive.
fn between(_field: &mut FieldInstance, args: &RuleArgs) -> Result<Validator> {
    let min_val = args.number("min_val")?;
    let max_val = args.number("max_val")?;
    let negative = args.bool("negative")?;
    Ok(Box::new(move |value| {
        let number = expect_number(value)?;
        let inside = number >= min_val && number <= max_val;
        match (inside, negative) {
            (true, false) | (false, true) => Ok(()),
            (false, false) => Err(ValidationFailure::message(format!(
                "Value must be between {min_val} and {max_val}."
            ))),
            (true, true) => Err(ValidationFailure::message(format!(
                "Value must not be between {min_val} and {max_val}."
            ))),
        }
    }))
}

fn max_decimal_places(_field: &mut FieldInstance, args: &RuleArgs) -> Result<Validator> {
    let decimal_places = args.int("decimal_places")?;
    Ok(Box::new(move |value| {
        let number = expect_number(value)?;
        if count_decimal_places(number) > decimal_places {
            Err(ValidationFailure::message(format!(
                "Value must have at most {decimal_places} decimal places."
            )))
        } else {
            Ok(())
        }
    }))
}

fn count_decimal_places(number: f64) -> i64 {
    let text = format!("{number}");
    match text.find('.') {
        Some(dot) => (text.len() - dot - 1) as i64,
        None => 0,
    }
}
