//! Key-check tokens.
//!
//! A token is a fixed marker sealed under the real key when the key is
//! first provisioned. A candidate key is valid exactly when it opens the
//! token back to the marker.

use crate::cipher::{EncryptedData, open, seal};
use crate::error::CryptoResult;
use crate::key::DerivedKey;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

const KEY_CHECK_MARKER: &[u8] = b"vaultline-key-check-v1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCheck(EncryptedData);

impl KeyCheck {
    pub fn new(key: &DerivedKey) -> CryptoResult<Self> {
        seal(key, KEY_CHECK_MARKER).map(Self)
    }

    pub fn sealed(&self) -> &EncryptedData {
        &self.0
    }
}

/// Returns false on any error or mismatch.
pub fn is_derived_key_valid(key: &DerivedKey, check: &KeyCheck) -> bool {
    match open(key, &check.0) {
        Ok(plaintext) => bool::from(plaintext.as_slice().ct_eq(KEY_CHECK_MARKER)),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{KdfParams, Salt, derive_key, generate_random_key};

    #[test]
    fn derived_key_validates_against_its_own_token() {
        let salt = Salt::random();
        let params = KdfParams::low_cost();
        let key = derive_key("correct horse", &salt, &params).unwrap();
        let check = KeyCheck::new(&key).unwrap();

        let again = derive_key("correct horse", &salt, &params).unwrap();
        assert!(is_derived_key_valid(&again, &check));

        let wrong = derive_key("battery staple", &salt, &params).unwrap();
        assert!(!is_derived_key_valid(&wrong, &check));
    }

    #[test]
    fn token_sealing_other_content_is_rejected() {
        let key = generate_random_key();
        let forged = KeyCheck(seal(&key, b"something else").unwrap());
        assert!(!is_derived_key_valid(&key, &forged));
    }
}
