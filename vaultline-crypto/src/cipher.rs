//! ChaCha20-Poly1305 authenticated encryption.
//!
//! The IV is always generated here. Callers cannot supply one, so nonce
//! reuse under a single key is limited to the birthday bound of 96 random
//! bits.

use crate::encoding::base64_bytes;
use crate::error::{CryptoError, CryptoResult};
use crate::key::DerivedKey;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// IV size in bytes.
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag size in bytes; appended to `data`.
pub const TAG_SIZE: usize = 16;

/// A sealed payload: the random IV and the ciphertext with its tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

fn cipher_for(key: &DerivedKey) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()))
}

/// Encrypts `plaintext` under `key` with a fresh random IV.
pub fn seal(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let data = cipher_for(key)
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(EncryptedData {
        iv: nonce.to_vec(),
        data,
    })
}

/// Decrypts and authenticates. Any defect in the input is an `AuthFailure`.
pub fn open(key: &DerivedKey, sealed: &EncryptedData) -> CryptoResult<Vec<u8>> {
    if sealed.iv.len() != NONCE_SIZE || sealed.data.len() < TAG_SIZE {
        return Err(CryptoError::AuthFailure);
    }
    cipher_for(key)
        .decrypt(Nonce::from_slice(&sealed.iv), sealed.data.as_slice())
        .map_err(|_| CryptoError::AuthFailure)
}

/// Serializes `value` to JSON and seals it.
pub fn seal_json<T: Serialize + ?Sized>(key: &DerivedKey, value: &T) -> CryptoResult<EncryptedData> {
    let bytes = serde_json::to_vec(value).map_err(|e| CryptoError::Serialization(e.to_string()))?;
    seal(key, &bytes)
}

/// Opens a sealed JSON document and checks it against `T`.
///
/// A payload that authenticates but does not have the shape of `T` is
/// treated the same as a forged one.
pub fn open_json<T: DeserializeOwned>(key: &DerivedKey, sealed: &EncryptedData) -> CryptoResult<T> {
    let bytes = open(key, sealed)?;
    serde_json::from_slice(&bytes).map_err(|_| CryptoError::AuthFailure)
}
