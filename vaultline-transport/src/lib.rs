//! IPC session between the host and display processes.
//!
//! The host generates an X25519 keypair when a session starts and answers a
//! single plaintext query for its public key. The display wraps a fresh
//! 256-bit session key to that public key; after the host unwraps it, every
//! request and response travels as a ChaCha20-Poly1305 envelope.
//!
//! ```text
//! display                       host
//!    │  PublicKeyQuery  ───────▶  │   (plaintext)
//!    │  ◀─────── PublicKey{der}   │
//!    │  WrappedKey      ───────▶  │   host: KeyExchanged → Ready
//!    │  ◀─────────── KeyAccepted  │   display: Ready
//!    │  Sealed(request) ───────▶  │
//!    │  ◀──────  Sealed(response) │
//! ```
//!
//! A sealed payload that fails to open is a protocol violation: the side
//! that saw it moves to [`SideState::Violated`] and stays there until the
//! host restarts with a new keypair.

mod channel;
mod display;
mod error;
mod frame;
mod host;
mod state;

pub use channel::{DisplayEndpoint, HostEndpoint, RequestHandler, pair};
pub use display::DisplaySession;
pub use error::{TransportError, TransportResult};
pub use frame::{Frame, FrameErrorKind};
pub use host::HostSession;
pub use state::{ReadinessWatch, SideState, both_ready};
