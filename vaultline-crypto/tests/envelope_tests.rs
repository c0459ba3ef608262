use vaultline_crypto::envelope::{HostKeyPair, public_key_from_der, wrap_session_key};
use vaultline_crypto::{CryptoError, DerivedKey, WrappedKey, generate_random_key, open, seal};

#[test]
fn wrap_unwrap_roundtrip_through_der() {
    let host = HostKeyPair::generate();
    let der = host.public_key_der();

    let display_pk = public_key_from_der(&der).unwrap();
    assert_eq!(display_pk.as_bytes(), host.public_key().as_bytes());

    let session_key = generate_random_key();
    let wrapped = wrap_session_key(&session_key, &display_pk).unwrap();
    let unwrapped = host.unwrap_session_key(&wrapped).unwrap();

    assert_eq!(unwrapped.as_bytes(), session_key.as_bytes());
}

#[test]
fn both_sides_share_a_working_cipher_key() {
    let host = HostKeyPair::generate();
    let session_key = generate_random_key();
    let wrapped = wrap_session_key(&session_key, host.public_key()).unwrap();
    let host_key = host.unwrap_session_key(&wrapped).unwrap();

    let sealed = seal(&session_key, br#"{"op":"listStorages"}"#).unwrap();
    assert_eq!(open(&host_key, &sealed).unwrap(), br#"{"op":"listStorages"}"#);
}

#[test]
fn wrong_host_cannot_unwrap() {
    let intended = HostKeyPair::generate();
    let other = HostKeyPair::generate();

    let wrapped = wrap_session_key(&generate_random_key(), intended.public_key()).unwrap();
    let err = other.unwrap_session_key(&wrapped).unwrap_err();
    assert!(matches!(err, CryptoError::AuthFailure));
}

#[test]
fn tampered_wrapped_key_fails() {
    let host = HostKeyPair::generate();
    let mut wrapped = wrap_session_key(&generate_random_key(), host.public_key()).unwrap();
    if let Some(byte) = wrapped.ciphertext.first_mut() {
        *byte ^= 0xFF;
    }
    assert!(host.unwrap_session_key(&wrapped).is_err());
}

#[test]
fn tampered_nonce_fails() {
    let host = HostKeyPair::generate();
    let mut wrapped = wrap_session_key(&generate_random_key(), host.public_key()).unwrap();
    wrapped.nonce[0] ^= 0x01;
    assert!(host.unwrap_session_key(&wrapped).is_err());
}

#[test]
fn each_wrap_uses_fresh_ephemeral_key() {
    let host = HostKeyPair::generate();
    let key = DerivedKey::from_bytes([9u8; 32]);
    let a = wrap_session_key(&key, host.public_key()).unwrap();
    let b = wrap_session_key(&key, host.public_key()).unwrap();
    assert_ne!(a.ephemeral_public_key, b.ephemeral_public_key);
    assert_ne!(a.ciphertext, b.ciphertext);
}

#[test]
fn regenerated_host_invalidates_old_wraps() {
    let before = HostKeyPair::generate();
    let wrapped = wrap_session_key(&generate_random_key(), before.public_key()).unwrap();
    let after = HostKeyPair::generate();
    assert!(after.unwrap_session_key(&wrapped).is_err());
}

#[test]
fn truncated_der_is_rejected() {
    let der = HostKeyPair::generate().public_key_der();
    assert!(matches!(
        public_key_from_der(&der[..32]),
        Err(CryptoError::InvalidPublicKey(_))
    ));
    assert!(public_key_from_der(&[]).is_err());
}

#[test]
fn wrapped_key_json_roundtrip() {
    let host = HostKeyPair::generate();
    let wrapped = wrap_session_key(&generate_random_key(), host.public_key()).unwrap();
    let json = serde_json::to_string(&wrapped).unwrap();
    assert!(json.contains("ephemeralPublicKey"));
    let back: WrappedKey = serde_json::from_str(&json).unwrap();
    assert_eq!(back, wrapped);
    assert!(host.unwrap_session_key(&back).is_ok());
}
