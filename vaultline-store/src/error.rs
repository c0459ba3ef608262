//! Error types for the store.

use thiserror::Error;
use vaultline_crypto::CryptoError;
use vaultline_schema::{SchemaError, SchemaViolation};
use vaultline_types::GroupId;

/// All errors that can occur in store operations.
///
/// None of the variants carry key material or decrypted content.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A sealed record failed to open or did not have the expected shape.
    #[error("authentication failed")]
    AuthFailure,

    #[error("visibility group {0} is locked")]
    GroupLocked(GroupId),

    #[error("value {index} ('{field}') rejected: {reason}")]
    ValidationFailure {
        index: usize,
        field: String,
        reason: String,
    },

    #[error("{scope} name '{name}' is already in use")]
    NotUnique { scope: &'static str, name: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid template: {0}")]
    InvalidTemplate(#[from] SchemaError),

    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CryptoError> for StoreError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::AuthFailure => StoreError::AuthFailure,
            other => StoreError::Crypto(other),
        }
    }
}

impl From<SchemaViolation> for StoreError {
    fn from(v: SchemaViolation) -> Self {
        StoreError::ValidationFailure {
            index: v.index,
            field: v.field,
            reason: v.reason.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
