use crate::frame::FrameErrorKind;
use thiserror::Error;
use vaultline_crypto::CryptoError;

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("session is not ready")]
    NotReady,

    /// A sealed payload failed to open or did not have the expected shape.
    #[error("authentication failed")]
    AuthFailure,

    #[error("session dropped after a protocol violation")]
    Violated,

    #[error("unexpected frame: {0}")]
    UnexpectedFrame(String),

    #[error("peer reported {kind}: {message}")]
    Remote {
        kind: FrameErrorKind,
        message: String,
    },

    #[error("channel closed")]
    ChannelClosed,

    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("crypto error: {0}")]
    Crypto(CryptoError),
}

impl From<CryptoError> for TransportError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::AuthFailure => Self::AuthFailure,
            other => Self::Crypto(other),
        }
    }
}

impl TransportError {
    /// The kind reported to the peer in an error frame.
    pub fn frame_kind(&self) -> FrameErrorKind {
        match self {
            Self::NotReady => FrameErrorKind::NotReady,
            Self::AuthFailure => FrameErrorKind::AuthFailure,
            Self::Violated => FrameErrorKind::Violated,
            Self::Malformed(_) => FrameErrorKind::Malformed,
            Self::UnexpectedFrame(_) | Self::Remote { .. } | Self::ChannelClosed => {
                FrameErrorKind::UnexpectedFrame
            }
            Self::Crypto(_) => FrameErrorKind::Internal,
        }
    }
}
