//! Wire frames. Each frame is one JSON document.

use crate::error::TransportResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use vaultline_crypto::{EncryptedData, WrappedKey, encoding::base64_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Frame {
    /// The only request answered in plaintext.
    PublicKeyQuery,
    PublicKey {
        #[serde(with = "base64_bytes")]
        der: Vec<u8>,
    },
    WrappedKey(WrappedKey),
    KeyAccepted,
    Sealed(EncryptedData),
    Error {
        kind: FrameErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameErrorKind {
    NotReady,
    AuthFailure,
    Violated,
    UnexpectedFrame,
    Malformed,
    Internal,
}

impl fmt::Display for FrameErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotReady => "not ready",
            Self::AuthFailure => "authentication failure",
            Self::Violated => "session violated",
            Self::UnexpectedFrame => "unexpected frame",
            Self::Malformed => "malformed frame",
            Self::Internal => "internal error",
        };
        f.write_str(s)
    }
}

impl Frame {
    pub fn error(kind: FrameErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    /// Short name for logs. Never includes payload bytes.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PublicKeyQuery => "publicKeyQuery",
            Self::PublicKey { .. } => "publicKey",
            Self::WrappedKey(_) => "wrappedKey",
            Self::KeyAccepted => "keyAccepted",
            Self::Sealed(_) => "sealed",
            Self::Error { .. } => "error",
        }
    }

    pub fn encode(&self) -> TransportResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> TransportResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
