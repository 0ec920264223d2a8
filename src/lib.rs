//! Contract Validation Engine
//!
//! A rule-resolution engine that turns human-readable rule phrases into
//! compiled per-field validators. Contract authors write rules such as
//! `"Length between 5 and 50"` or `"Maximum $values.limit"`; the engine
//! matches each phrase against the alias patterns registered for the
//! field's type, resolves `$values.*` references against the contract's
//! shared value table, and assembles the result into an ordered validator
//! set per field.
//!
//! ## Features
//!
//! - **Alias Matching**: Typed `{name:Type}` placeholders compiled to
//!   case-insensitive anchored patterns
//! - **Type Hierarchy**: Field types form an explicit DAG; rules declared on
//!   an ancestor apply to every descendant
//! - **Exactly-One Resolution**: Zero matches and multiple matches are both
//!   hard errors, never silently tie-broken
//! - **Value References**: `$values.key` tokens resolved once per rule and
//!   type-checked against the placeholder's declared type
//! - **Logical Composition**: AND / OR / NOT rule trees with exhaustive
//!   child evaluation and complete failure reporting
//! - **Describable Rules**: Every resolved rule serializes back to a
//!   lossless description, references rendered in their `$values.*` form
//!
//! ## Architecture
//!
//! 1. **Params** (`params`): The placeholder type system and its literal
//!    grammar.
//!
//! 2. **Pattern** (`pattern`): Alias compilation and phrase matching.
//!
//! 3. **Registry** (`registry`): The field-type DAG and rule templates,
//!    with a build phase followed by a frozen read-only phase.
//!
//! 4. **Resolver** (`resolver`): Phrase to template resolution over the
//!    hierarchy.
//!
//! 5. **Matched / Logical** (`matched`, `logical`): Resolved rules,
//!    reference resolution, and logical composition.
//!
//! 6. **Field** (`field`): Per-field validator assembly and the optionality
//!    side effect of the "Is not null" rule.
//!
//! 7. **Catalog** (`catalog`): The built-in field types and rules.
//!
//! ## Example
//!
//! ```rust
//! use contract_validation::{
//!     builtin_registry, build_field_validator, RuleSpec, Value, ValueTable,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = builtin_registry()?;
//!     let values = ValueTable::new().with("max_len", 50_i64);
//!
//!     let validator = build_field_validator(
//!         &registry,
//!         "StringField",
//!         "title",
//!         &[
//!             RuleSpec::from("Is not null"),
//!             RuleSpec::from("Maximum length of $values.max_len"),
//!         ],
//!         &values,
//!     )?;
//!
//!     assert!(!validator.is_optional());
//!     assert!(validator.validate(&Value::from("A short title")).is_ok());
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod field;
pub mod logical;
pub mod matched;
pub mod params;
pub mod pattern;
pub mod registry;
pub mod resolver;
pub mod value;

pub use catalog::builtin_registry;
pub use error::{ContractError, Result, ValidationFailure};
pub use field::{build_field_validator, FieldInstance, FieldValidator, RuleSpec, Validator};
pub use logical::{LogicalOperator, LogicalRule, ProcessedRule, RuleDescription};
pub use matched::{MatchedRule, MatchedRuleDescription};
pub use params::ParamType;
pub use pattern::{AliasPattern, CapturedParam};
pub use registry::{
    FieldTypeId, RuleArgs, RuleFactory, RuleRegistry, RuleTemplate, TypeDefinition,
};
pub use resolver::RuleResolver;
pub use value::{ValueTable, Value};

/// Engine version (from Cargo.toml)
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
