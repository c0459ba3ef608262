use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Tag mismatch, truncated ciphertext, malformed IV, or a decrypted
    /// payload that does not have the expected structure. Deliberately
    /// carries no detail about which.
    #[error("authentication failed")]
    AuthFailure,

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
