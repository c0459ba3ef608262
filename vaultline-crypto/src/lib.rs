//! Encryption layer for Vaultline.
//!
//! Provides the primitives every other crate builds on:
//! - ChaCha20-Poly1305 authenticated encryption with internally generated IVs
//! - Argon2id key derivation for verification hashes and vault keys
//! - Key-check tokens that detect a wrong password without storing it
//! - X25519 envelope sealing for transporting the IPC session key
//!
//! # Key hierarchy
//!
//! A password is never used directly. Two independent derivations exist:
//!
//! 1. **Verification hash**: Argon2id over the password with its own salt,
//!    stored and compared in constant time. Never used as a cipher key.
//!
//! 2. **Vault key**: Argon2id over the same password with a *different*
//!    salt. Held in memory while a group is open and never persisted. A
//!    leaked verification hash reveals nothing about this key.

mod check;
mod cipher;
pub mod encoding;
pub mod envelope;
mod error;
mod key;
mod verifier;

pub use check::{KeyCheck, is_derived_key_valid};
pub use cipher::{EncryptedData, NONCE_SIZE, TAG_SIZE, open, open_json, seal, seal_json};
pub use envelope::{HostKeyPair, WrappedKey, public_key_from_der, wrap_session_key};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    DerivedKey, KEY_SIZE, KdfParams, SALT_SIZE, Salt, derive_bytes, derive_key,
    generate_random_key,
};
pub use verifier::{PasswordVerifier, VERIFIER_HASH_LEN};
