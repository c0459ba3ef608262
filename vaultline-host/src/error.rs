use crate::protocol::{ErrorKind, VaultResponse};
use thiserror::Error;
use vaultline_groups::GroupError;
use vaultline_store::StoreError;

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Why a request failed. Projected to a [`VaultResponse::Error`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no account is signed in")]
    NotSignedIn,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Group(#[from] GroupError),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotSignedIn => ErrorKind::NotSignedIn,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Store(err) => match err {
                StoreError::AuthFailure => ErrorKind::AuthFailure,
                StoreError::GroupLocked(_) => ErrorKind::GroupLocked,
                StoreError::ValidationFailure { .. } => ErrorKind::ValidationFailure,
                StoreError::NotUnique { .. } => ErrorKind::NotUnique,
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::InvalidState(_) => ErrorKind::InvalidState,
                StoreError::InvalidInput(_) => ErrorKind::InvalidInput,
                StoreError::InvalidTemplate(_) => ErrorKind::InvalidTemplate,
                StoreError::Crypto(_)
                | StoreError::Sqlite(_)
                | StoreError::Json(_)
                | StoreError::Io(_) => ErrorKind::Internal,
            },
            Self::Group(err) => match err {
                GroupError::NotFound(_) => ErrorKind::NotFound,
                GroupError::EmptyName => ErrorKind::InvalidInput,
                GroupError::Crypto(_) | GroupError::Source(_) => ErrorKind::Internal,
            },
        }
    }

    pub fn into_response(self) -> VaultResponse {
        let field_index = match &self {
            Self::Store(StoreError::ValidationFailure { index, .. }) => Some(*index),
            _ => None,
        };
        let message = match self.kind() {
            // Internal details stay in the host log.
            ErrorKind::Internal => "internal error".to_string(),
            _ => self.to_string(),
        };
        VaultResponse::Error {
            kind: self.kind(),
            message,
            field_index,
        }
    }
}
