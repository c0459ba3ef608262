use thiserror::Error;
use vaultline_types::FieldKind;

pub type SchemaResult<T> = Result<T, SchemaError>;

/// A template definition that cannot be compiled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("field {index} has an empty name")]
    EmptyName { index: usize },

    #[error("field name '{name}' is used more than once")]
    DuplicateName { name: String },

    #[error("field {index} ('{field}'): {reason}")]
    InvalidConstraint {
        index: usize,
        field: String,
        reason: String,
    },
}

/// Why a value was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViolationReason {
    #[error("expected a value of type {0:?}")]
    WrongType(FieldKind),

    #[error("value is below the minimum")]
    BelowMinimum,

    #[error("value is above the maximum")]
    AboveMaximum,

    #[error("value is not a multiple of {0}")]
    NotMultiple(String),

    #[error("no value supplied")]
    Missing,

    #[error("more values than template fields")]
    Unexpected,
}

/// The first offending value of an entry.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("value {index} ('{field}'): {reason}")]
pub struct SchemaViolation {
    pub index: usize,
    /// Field name, or empty for values beyond the last field.
    pub field: String,
    pub reason: ViolationReason,
}
