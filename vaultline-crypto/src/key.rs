//! Argon2id key derivation and key material newtypes.

use crate::encoding::base64_array;
use crate::error::{CryptoError, CryptoResult};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Symmetric key size in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Salt size in bytes.
pub const SALT_SIZE: usize = 16;

/// A 256-bit symmetric key. Zeroized on drop; never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_SIZE]);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Generates a fresh random key from the OS RNG.
pub fn generate_random_key() -> DerivedKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    DerivedKey(bytes)
}

/// A random, non-secret KDF salt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Salt(#[serde(with = "base64_array")] [u8; SALT_SIZE]);

impl Salt {
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// Argon2id work factors.
///
/// The defaults are fixed for interactive desktop use: 64 MiB of memory,
/// three passes, four lanes. Each derivation blocks the calling thread for
/// a noticeable fraction of a second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Minimal work factors. Only for tests and throwaway vaults.
    pub fn low_cost() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Derives `output_len` bytes from a password and salt with Argon2id.
pub fn derive_bytes(
    password: &str,
    salt: &Salt,
    output_len: usize,
    params: &KdfParams,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(output_len),
    )
    .map_err(|e| CryptoError::KeyDerivation(format!("argon2 params: {e}")))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut output = Zeroizing::new(vec![0u8; output_len]);
    argon
        .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut output)
        .map_err(|e| CryptoError::KeyDerivation(format!("argon2 derive: {e}")))?;
    Ok(output)
}

/// Derives a 32-byte symmetric key suitable for [`crate::seal`].
pub fn derive_key(password: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<DerivedKey> {
    let bytes = derive_bytes(password, salt, KEY_SIZE, params)?;
    DerivedKey::from_slice(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let salt = Salt::random();
        let params = KdfParams::low_cost();
        let a = derive_key("hunter2", &salt, &params).unwrap();
        let b = derive_key("hunter2", &salt, &params).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_salts_give_different_keys() {
        let params = KdfParams::low_cost();
        let a = derive_key("hunter2", &Salt::random(), &params).unwrap();
        let b = derive_key("hunter2", &Salt::random(), &params).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn output_length_is_honoured() {
        let bytes = derive_bytes("pw", &Salt::random(), 48, &KdfParams::low_cost()).unwrap();
        assert_eq!(bytes.len(), 48);
    }

    #[test]
    fn invalid_params_are_reported() {
        let params = KdfParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        let err = derive_key("pw", &Salt::random(), &params).unwrap_err();
        assert!(matches!(err, CryptoError::KeyDerivation(_)));
    }

    #[test]
    fn debug_redacts_key() {
        let key = generate_random_key();
        assert_eq!(format!("{key:?}"), "DerivedKey([REDACTED])");
    }

    #[test]
    fn salt_serializes_as_base64() {
        let salt = Salt::from_bytes([7u8; SALT_SIZE]);
        let json = serde_json::to_string(&salt).unwrap();
        assert_eq!(json, "\"BwcHBwcHBwcHBwcHBwcHBw==\"");
        let back: Salt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, salt);
    }
}
