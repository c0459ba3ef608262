//! Stored password verification hashes.

use crate::encoding::base64_bytes;
use crate::error::CryptoResult;
use crate::key::{KdfParams, Salt, derive_bytes};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Length of the stored verification hash.
pub const VERIFIER_HASH_LEN: usize = 32;

/// Argon2id hash of a password with its own salt and work factors.
///
/// Safe to persist. Never used as a cipher key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordVerifier {
    #[serde(with = "base64_bytes")]
    pub hash: Vec<u8>,
    pub salt: Salt,
    pub params: KdfParams,
}

impl PasswordVerifier {
    pub fn create(password: &str, params: &KdfParams) -> CryptoResult<Self> {
        let salt = Salt::random();
        let hash = derive_bytes(password, &salt, VERIFIER_HASH_LEN, params)?;
        Ok(Self {
            hash: hash.to_vec(),
            salt,
            params: *params,
        })
    }

    pub fn verify(&self, password: &str) -> CryptoResult<bool> {
        let candidate = derive_bytes(password, &self.salt, self.hash.len(), &self.params)?;
        Ok(bool::from(candidate.as_slice().ct_eq(&self.hash)))
    }
}
