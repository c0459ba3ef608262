//! Session-key transport between the display and the host.
//!
//! The host holds an X25519 keypair for the lifetime of one process and
//! publishes the public half as an RFC 8410 SubjectPublicKeyInfo document.
//! The display wraps a fresh 256-bit session key to that public key with an
//! ephemeral sender key (X25519 + XSalsa20-Poly1305), so only the holder of
//! the host secret can recover it.

use crate::encoding::{base64_array, base64_bytes};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, KEY_SIZE};
use crypto_box::aead::Aead;
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// DER prefix of an X25519 SubjectPublicKeyInfo (OID 1.3.101.110).
const X25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x6e, 0x03, 0x21, 0x00,
];

const X25519_SPKI_LEN: usize = X25519_SPKI_PREFIX.len() + 32;

/// The host's transport keypair. Generated per process, never persisted.
///
/// The secret key zeroizes itself on drop.
pub struct HostKeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl HostKeyPair {
    pub fn generate() -> Self {
        let secret = SecretKey::generate(&mut rand::rngs::OsRng);
        let public = secret.public_key();
        Self { secret, public }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn public_key_der(&self) -> Vec<u8> {
        let mut der = Vec::with_capacity(X25519_SPKI_LEN);
        der.extend_from_slice(&X25519_SPKI_PREFIX);
        der.extend_from_slice(self.public.as_bytes());
        der
    }

    /// Recovers a session key wrapped to this keypair.
    pub fn unwrap_session_key(&self, wrapped: &WrappedKey) -> CryptoResult<DerivedKey> {
        let ephemeral_pk = PublicKey::from(wrapped.ephemeral_public_key);
        let salsa_box = SalsaBox::new(&ephemeral_pk, &self.secret);

        let plaintext = Zeroizing::new(
            salsa_box
                .decrypt(
                    crypto_box::Nonce::from_slice(&wrapped.nonce),
                    wrapped.ciphertext.as_slice(),
                )
                .map_err(|_| CryptoError::AuthFailure)?,
        );

        if plaintext.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: plaintext.len(),
            });
        }
        DerivedKey::from_slice(&plaintext)
    }
}

/// Parses a DER-encoded X25519 SubjectPublicKeyInfo.
pub fn public_key_from_der(der: &[u8]) -> CryptoResult<PublicKey> {
    if der.len() != X25519_SPKI_LEN {
        return Err(CryptoError::InvalidPublicKey(format!(
            "expected {X25519_SPKI_LEN} bytes, got {}",
            der.len()
        )));
    }
    let (prefix, raw) = der.split_at(X25519_SPKI_PREFIX.len());
    if prefix != X25519_SPKI_PREFIX {
        return Err(CryptoError::InvalidPublicKey(
            "not an X25519 SubjectPublicKeyInfo".to_string(),
        ));
    }
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(raw);
    Ok(PublicKey::from(bytes))
}

/// A session key sealed to the host public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedKey {
    /// Ephemeral X25519 public key (sender side of DH).
    #[serde(with = "base64_array")]
    pub ephemeral_public_key: [u8; 32],
    #[serde(with = "base64_array")]
    pub nonce: [u8; 24],
    /// XSalsa20-Poly1305 ciphertext + tag.
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
}

/// Wraps `session_key` so that only the holder of `recipient`'s secret can
/// recover it.
pub fn wrap_session_key(session_key: &DerivedKey, recipient: &PublicKey) -> CryptoResult<WrappedKey> {
    let ephemeral = SecretKey::generate(&mut rand::rngs::OsRng);
    let ephemeral_pk = ephemeral.public_key();

    let salsa_box = SalsaBox::new(recipient, &ephemeral);

    let mut nonce_bytes = [0u8; 24];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = salsa_box
        .encrypt(
            crypto_box::Nonce::from_slice(&nonce_bytes),
            session_key.as_bytes().as_slice(),
        )
        .map_err(|e| CryptoError::Encryption(format!("session key wrap failed: {e}")))?;

    Ok(WrappedKey {
        ephemeral_public_key: *ephemeral_pk.as_bytes(),
        nonce: nonce_bytes,
        ciphertext,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn der_has_fixed_layout() {
        let host = HostKeyPair::generate();
        let der = host.public_key_der();
        assert_eq!(der.len(), 44);
        assert_eq!(&der[..12], &X25519_SPKI_PREFIX);
        assert_eq!(&der[12..], host.public_key().as_bytes());
    }

    #[test]
    fn der_parse_rejects_other_algorithms() {
        let mut der = HostKeyPair::generate().public_key_der();
        der[8] = 0x70; // Ed25519 OID arc
        assert!(matches!(
            public_key_from_der(&der),
            Err(CryptoError::InvalidPublicKey(_))
        ));
        assert!(public_key_from_der(&der[..43]).is_err());
    }
}
