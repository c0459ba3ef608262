use thiserror::Error;
use vaultline_crypto::CryptoError;
use vaultline_types::GroupId;

pub type GroupResult<T> = Result<T, GroupError>;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("visibility group not found: {0}")]
    NotFound(GroupId),

    #[error("group name must not be empty")]
    EmptyName,

    #[error("group record source failed: {0}")]
    Source(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}
