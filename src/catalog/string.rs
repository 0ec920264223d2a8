//! Rules for string-valued fields

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ContractError, Result, ValidationFailure};
use crate::field::{FieldInstance, Validator};
use crate::registry::{RuleArgs, RuleFactory, RuleRegistry};
use crate::value::Value;

use super::{expect_str, STRING_FIELD};

pub(super) fn register(registry: &mut RuleRegistry) -> Result<()> {
    let rules: [(&str, RuleFactory); 12] = [
        ("Is not empty", RuleFactory { params: &["field"], build: not_empty }),
        ("Starts with {prefix:String}", RuleFactory { params: &["field", "prefix"], build: starts_with }),
        ("Ends with {suffix:String}", RuleFactory { params: &["field", "suffix"], build: ends_with }),
        ("Is uppercase", RuleFactory { params: &["field"], build: uppercase }),
        ("Is lowercase", RuleFactory { params: &["field"], build: lowercase }),
        ("Has no digits", RuleFactory { params: &["field"], build: no_digits }),
        (
            "Length between {min_len:Integer} and {max_len:Integer}",
            RuleFactory { params: &["field", "min_len", "max_len"], build: length_between },
        ),
        (
            "Minimum length of {min_len:Integer}",
            RuleFactory { params: &["field", "min_len"], build: min_length },
        ),
        (
            "Maximum length of {max_len:Integer}",
            RuleFactory { params: &["field", "max_len"], build: max_length },
        ),
        (
            "Matches regex {pattern:String}",
            RuleFactory { params: &["field", "pattern"], build: matches_regex },
        ),
        ("Is a valid email", RuleFactory { params: &["field"], build: email }),
        ("Is a valid URL", RuleFactory { params: &["field"], build: url }),
    ];
    for (alias, factory) in rules {
        registry.register_rule(STRING_FIELD, alias, factory, BTreeMap::new())?;
    }
    // one factory serves both directions; the fixed parameter picks the side
    let membership = RuleFactory {
        params: &["field", "possible_values", "negative"],
        build: value_in_list,
    };
    registry.register_rule(
        STRING_FIELD,
        "Value in {possible_values:Strings}",
        membership,
        BTreeMap::from([("negative".to_string(), Value::Bool(false))]),
    )?;
    registry.register_rule(
        STRING_FIELD,
        "Value not in {possible_values:Strings}",
        membership,
        BTreeMap::from([("negative".to_string(), Value::Bool(true))]),
    )?;
    Ok(())
}

fn not_empty(_field: &mut FieldInstance, _args: &RuleArgs) -> Result<Validator> {
    Ok(Box::new(|value| {
        if expect_str(value)?.is_empty() {
            Err(ValidationFailure::message("String cannot be empty."))
        } else {
            Ok(())
        }
    }))
}

fn starts_with(_field: &mut FieldInstance, args: &RuleArgs) -> Result<Validator> {
    let prefix = args.str("prefix")?.to_string();
    Ok(Box::new(move |value| {
        if expect_str(value)?.starts_with(&prefix) {
            Ok(())
        } else {
            Err(ValidationFailure::message(format!(
                "Value must start with '{prefix}'."
            )))
        }
    }))
}

fn ends_with(_field: &mut FieldInstance, args: &RuleArgs) -> Result<Validator> {
    let suffix = args.str("suffix")?.to_string();
    Ok(Box::new(move |value| {
        if expect_str(value)?.ends_with(&suffix) {
            Ok(())
        } else {
            Err(ValidationFailure::message(format!(
                "Value must end with '{suffix}'."
            )))
        }
    }))
}

fn uppercase(_field: &mut FieldInstance, _args: &RuleArgs) -> Result<Validator> {
    Ok(Box::new(|value| {
        let text = expect_str(value)?;
        if text.chars().any(|c| c.is_lowercase()) {
            Err(ValidationFailure::message("Value must be in uppercase."))
        } else {
            Ok(())
        }
    }))
}

fn lowercase(_field: &mut FieldInstance, _args: &RuleArgs) -> Result<Validator> {
    Ok(Box::new(|value| {
        let text = expect_str(value)?;
        if text.chars().any(|c| c.is_uppercase()) {
            Err(ValidationFailure::message("Value must be in lowercase."))
        } else {
            Ok(())
        }
    }))
}

fn no_digits(_field: &mut FieldInstance, _args: &RuleArgs) -> Result<Validator> {
    Ok(Box::new(|value| {
        if expect_str(value)?.chars().any(|c| c.is_ascii_digit()) {
            Err(ValidationFailure::message(
                "Value must not contain any digits.",
            ))
        } else {
            Ok(())
        }
    }))
}

fn length_between(_field: &mut FieldInstance, args: &RuleArgs) -> Result<Validator> {
    let min_len = args.int("min_len")?;
    let max_len = args.int("max_len")?;
    Ok(Box::new(move |value| {
        let length = expect_str(value)?.chars().count() as i64;
        if length < min_len || length > max_len {
            Err(ValidationFailure::message(format!(
                "Length must be between {min_len} and {max_len} characters."
            )))
        } else {
            Ok(())
        }
    }))
}

fn min_length(_field: &mut FieldInstance, args: &RuleArgs) -> Result<Validator> {
    let min_len = args.int("min_len")?;
    Ok(Box::new(move |value| {
        if (expect_str(value)?.chars().count() as i64) < min_len {
            Err(ValidationFailure::message(format!(
                "Length must be at least {min_len} characters."
            )))
        } else {
            Ok(())
        }
    }))
}

fn max_length(_field: &mut FieldInstance, args: &RuleArgs) -> Result<Validator> {
    let max_len = args.int("max_len")?;
    Ok(Box::new(move |value| {
        if (expect_str(value)?.chars().count() as i64) > max_len {
            Err(ValidationFailure::message(format!(
                "Length must not exceed {max_len} characters."
            )))
        } else {
            Ok(())
        }
    }))
}

/// Shared by the "Value in" and "Value not in" aliases; the fixed `negative`
/// parameter selects the direction
fn value_in_list(_field: &mut FieldInstance, args: &RuleArgs) -> Result<Validator> {
    let possible_values = args.str_list("possible_values")?;
    let negative = args.bool("negative")?;
    Ok(Box::new(move |value| {
        let text = expect_str(value)?;
        let listed = possible_values.iter().any(|v| v == text);
        match (listed, negative) {
            (true, false) | (false, true) => Ok(()),
            (false, false) => Err(ValidationFailure::message(format!(
                "Value '{text}' must be one of the possible values: {}.",
                display_list(&possible_values)
            ))),
            (true, true) => Err(ValidationFailure::message(format!(
                "Value '{text}' is not allowed. Forbidden values: {}.",
                display_list(&possible_values)
            ))),
        }
    }))
}

fn matches_regex(_field: &mut FieldInstance, args: &RuleArgs) -> Result<Validator> {
    let pattern = args.str("pattern")?.to_string();
    let regex = Regex::new(&pattern).map_err(|e| ContractError::InvalidPattern {
        pattern: pattern.clone(),
        reason: e.to_string(),
    })?;
    Ok(Box::new(move |value| {
        if regex.is_match(expect_str(value)?) {
            Ok(())
        } else {
            Err(ValidationFailure::message(format!(
                "Value does not match the required pattern {pattern}."
            )))
        }
    }))
}

fn email(_field: &mut FieldInstance, _args: &RuleArgs) -> Result<Validator> {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    Ok(Box::new(|value| {
        let regex = EMAIL.get_or_init(|| {
            // deliberately permissive; full RFC 5322 parsing is out of scope
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
        });
        if regex.is_match(expect_str(value)?) {
            Ok(())
        } else {
            Err(ValidationFailure::message("Invalid email format."))
        }
    }))
}

fn url(_field: &mut FieldInstance, _args: &RuleArgs) -> Result<Validator> {
    static URL: OnceLock<Regex> = OnceLock::new();
    Ok(Box::new(|value| {
        let regex = URL
            .get_or_init(|| Regex::new(r"^https?://\S+$").expect("url pattern is valid"));
        if regex.is_match(expect_str(value)?) {
            Ok(())
        } else {
            Err(ValidationFailure::message("Invalid URL format."))
        }
    }))
}

fn display_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("'{item}'")).collect();
    format!("[{}]", quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::super::builtin_registry;
    use crate::error::ContractError;
    use crate::field::{build_field_validator, FieldValidator, RuleSpec};
    use crate::value::{Value, ValueTable};

    fn string_validator(phrase: &str, values: &ValueTable) -> FieldValidator {
        build_field_validator(
            &builtin_registry().unwrap(),
            "StringField",
            "text",
            &[RuleSpec::from(phrase)],
            values,
        )
        .unwrap()
    }

    fn check(phrase: &str, value: &str) -> Result<(), String> {
        string_validator(phrase, &ValueTable::new())
            .validate(&Value::from(value))
            .map_err(|e| e.to_string())
    }

    #[test]
    fn test_not_empty() {
        assert!(check("Is not empty", "x").is_ok());
        assert_eq!(check("Is not empty", "").unwrap_err(), "String cannot be empty.");
    }

    #[test]
    fn test_starts_and_ends_with() {
        assert!(check("Starts with 'ab'", "abc").is_ok());
        assert_eq!(
            check("Starts with 'ab'", "bc").unwrap_err(),
            "Value must start with 'ab'."
        );
        assert!(check("Ends with 'bc'", "abc").is_ok());
        assert_eq!(
            check("Ends with 'bc'", "ab").unwrap_err(),
            "Value must end with 'bc'."
        );
    }

    #[test]
    fn test_case_rules() {
        assert!(check("Is uppercase", "ABC-123").is_ok());
        assert_eq!(
            check("Is uppercase", "Abc").unwrap_err(),
            "Value must be in uppercase."
        );
        assert!(check("Is lowercase", "abc-123").is_ok());
        assert_eq!(
            check("Is lowercase", "aBc").unwrap_err(),
            "Value must be in lowercase."
        );
    }

    #[test]
    fn test_no_digits() {
        assert!(check("Has no digits", "abc").is_ok());
        assert_eq!(
            check("Has no digits", "abc1").unwrap_err(),
            "Value must not contain any digits."
        );
    }

    #[test]
    fn test_length_rules() {
        assert!(check("Length between 2 and 4", "abc").is_ok());
        assert_eq!(
            check("Length between 2 and 4", "a").unwrap_err(),
            "Length must be between 2 and 4 characters."
        );
        assert_eq!(
            check("Length between 2 and 4", "abcde").unwrap_err(),
            "Length must be between 2 and 4 characters."
        );
        assert!(check("Minimum length of 3", "abc").is_ok());
        assert_eq!(
            check("Minimum length of 3", "ab").unwrap_err(),
            "Length must be at least 3 characters."
        );
        assert!(check("Maximum length of 3", "abc").is_ok());
        assert_eq!(
            check("Maximum length of 3", "abcd").unwrap_err(),
            "Length must not exceed 3 characters."
        );
    }

    #[test]
    fn test_length_between_with_references() {
        let values = ValueTable::new().with("min", 5_i64).with("max", 50_i64);
        let validator = string_validator("Length Between $values.min and $values.max", &values);
        assert_eq!(
            validator.validate(&Value::from("ab")).unwrap_err().to_string(),
            "Length must be between 5 and 50 characters."
        );
        assert!(validator.validate(&Value::from("abcdefghij")).is_ok());
    }

    #[test]
    fn test_value_in() {
        let phrase = "Value In ['UNCLASSIFIED', 'CLASSIFIED']";
        assert!(check(phrase, "UNCLASSIFIED").is_ok());
        assert_eq!(
            check(phrase, "SECRET").unwrap_err(),
            "Value 'SECRET' must be one of the possible values: ['UNCLASSIFIED', 'CLASSIFIED']."
        );
    }

    #[test]
    fn test_value_not_in() {
        let phrase = "Value not in ['root', 'admin']";
        assert!(check(phrase, "guest").is_ok());
        assert_eq!(
            check(phrase, "root").unwrap_err(),
            "Value 'root' is not allowed. Forbidden values: ['root', 'admin']."
        );
    }

    #[test]
    fn test_matches_regex() {
        assert!(check("Matches regex '^[a-z]+$'", "abc").is_ok());
        assert_eq!(
            check("Matches regex '^[a-z]+$'", "abc1").unwrap_err(),
            "Value does not match the required pattern ^[a-z]+$."
        );
    }

    #[test]
    fn test_matches_regex_invalid_pattern_fails_build() {
        let err = build_field_validator(
            &builtin_registry().unwrap(),
            "StringField",
            "text",
            &[RuleSpec::from("Matches regex '['")],
            &ValueTable::new(),
        )
        .unwrap_err();
        match &err {
            ContractError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "["),
            other => panic!("unexpected error: {other:?}"),
        }
        // bad contract data, not a registry-authoring defect
        assert!(!err.is_registration_error());
    }

    #[test]
    fn test_email_and_url() {
        assert!(check("Is a valid email", "a@b.co").is_ok());
        assert_eq!(
            check("Is a valid email", "not-an-email").unwrap_err(),
            "Invalid email format."
        );
        assert!(check("Is a valid URL", "https://example.com/x").is_ok());
        assert_eq!(
            check("Is a valid URL", "ftp://example.com").unwrap_err(),
            "Invalid URL format."
        );
    }

    #[test]
    fn test_non_string_value() {
        assert_eq!(
            check("Is not empty", "").unwrap_err(),
            "String cannot be empty."
        );
        let validator = string_validator("Is not empty", &ValueTable::new());
        assert_eq!(
            validator.validate(&Value::Int(5)).unwrap_err().to_string(),
            "Value must be a string."
        );
    }
}
