//! Error types for the contract validation engine
//!
//! Two disjoint error surfaces: [`ContractError`] for registry-time and
//! resolution-time defects that abort a contract build, and
//! [`ValidationFailure`] for per-value outcomes returned by compiled
//! validators. A validation failure is never escalated to a contract error.

use thiserror::Error;

use crate::registry::FieldTypeId;

/// Errors raised while registering field types and rules or while resolving
/// rule phrases into matched rules.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractError {
    /// No registered template (self or ancestor) matches a raw phrase
    #[error("Rule '{phrase}' not found for field type '{field_type}' (searched: {searched:?})")]
    RuleNotFound {
        field_type: FieldTypeId,
        phrase: String,
        searched: Vec<FieldTypeId>,
    },

    /// More than one template matches a raw phrase
    #[error("Rule '{phrase}' is ambiguous for field type '{field_type}': matches {candidates:?}")]
    AmbiguousRuleSolution {
        field_type: FieldTypeId,
        phrase: String,
        candidates: Vec<String>,
    },

    /// A `$values.` token does not conform to the reference grammar
    #[error("Malformed reference: '{0}'")]
    MalformedReference(String),

    /// A well-formed reference names a key absent from the value table
    #[error("Key '{0}' not found in values")]
    ReferenceNotFound(String),

    /// A reference's or array literal's value does not match the expected
    /// parameter type
    #[error("Incompatible element type: expected {expected}, got '{found}'")]
    IncompatibleElementType { expected: String, found: String },

    /// A pattern supplied as a rule parameter failed to compile; this is a
    /// contract-authoring data error, not a registration defect
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Alias placeholders plus fixed parameters do not equal the factory's
    /// declared parameter names
    #[error("Parameter mismatch: {0}")]
    ParameterMismatch(String),

    /// A validator factory does not declare the field receiver parameter
    #[error("Not a field method: {0}")]
    NotAFieldMethod(String),

    /// A matched rule was asked to build a predicate for a field instance of
    /// the wrong type
    #[error("Cannot add rule for '{expected}' to a field of type '{found}'")]
    FieldTypeMismatch {
        expected: FieldTypeId,
        found: FieldTypeId,
    },

    /// The field-type hierarchy contains a cycle
    #[error("Cycle detected in field type hierarchy at '{0}'")]
    CycleDetected(FieldTypeId),

    /// A logical rule specification is structurally invalid
    #[error("Malformed logical rule: {0}")]
    MalformedLogicalRule(String),

    /// A field type was named that is not present in the registry
    #[error("Field type not registered: '{0}'")]
    UnknownFieldType(FieldTypeId),

    /// A registration call arrived after the registry was frozen
    #[error("Registry is frozen; registration is only allowed during startup")]
    RegistryFrozen,
}

impl ContractError {
    /// Check if this is a registration-time defect (author error) as opposed
    /// to a resolution-time data error
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            ContractError::ParameterMismatch(_)
                | ContractError::NotAFieldMethod(_)
                | ContractError::CycleDetected(_)
                | ContractError::RegistryFrozen
        )
    }
}

/// Per-value validation outcomes produced by compiled validators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    /// A single predicate rejected the value
    #[error("{0}")]
    Message(String),

    /// An AND combination had at least one failing child; carries only the
    /// failing children's messages
    #[error("Not all conditions were met. Errors: {0:?}")]
    LogicalAndFailed(Vec<String>),

    /// An OR combination had no passing child; carries every child's message
    #[error("None of the conditions were met. Errors: {0:?}")]
    LogicalOrFailed(Vec<String>),

    /// A NOT-wrapped predicate succeeded where it was expected to fail
    #[error("Condition was met, but expected NOT to be met.")]
    NegationViolated,
}

impl ValidationFailure {
    /// Create a plain message failure
    pub fn message(msg: impl Into<String>) -> Self {
        ValidationFailure::Message(msg.into())
    }
}

/// Result type alias for contract build operations
pub type Result<T> = std::result::Result<T, ContractError>;
