//! Host side of the session.

use crate::error::{TransportError, TransportResult};
use crate::state::{ReadinessWatch, SideState, StateCell};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use vaultline_crypto::{DerivedKey, EncryptedData, HostKeyPair, WrappedKey, open_json, seal_json};

/// Keypair, session key and state of the host. Nothing here is persisted:
/// a restart regenerates the keypair and forces a new key exchange.
pub struct HostSession {
    keypair: Option<HostKeyPair>,
    session_key: Option<DerivedKey>,
    state: StateCell,
}

impl HostSession {
    /// A session in `Idle`. Call [`start`](Self::start) before serving.
    pub fn new() -> Self {
        Self {
            keypair: None,
            session_key: None,
            state: StateCell::new("host"),
        }
    }

    /// Generates a fresh keypair and forgets any session key. Calling it on
    /// a running or violated session is a restart.
    pub fn start(&mut self) {
        let restarting = self.keypair.is_some();
        self.keypair = Some(HostKeyPair::generate());
        self.session_key = None;
        self.state.set(SideState::KeypairReady);
        info!(restart = restarting, "host session keypair generated");
    }

    pub fn state(&self) -> SideState {
        self.state.get()
    }

    pub fn subscribe(&self) -> ReadinessWatch {
        self.state.watch()
    }

    fn ensure_not_violated(&self) -> TransportResult<()> {
        match self.state.get() {
            SideState::Violated => Err(TransportError::Violated),
            _ => Ok(()),
        }
    }

    /// DER (SubjectPublicKeyInfo) encoding of the host public key.
    pub fn public_key_der(&self) -> TransportResult<Vec<u8>> {
        self.ensure_not_violated()?;
        self.keypair
            .as_ref()
            .map(HostKeyPair::public_key_der)
            .ok_or(TransportError::NotReady)
    }

    /// Unwraps the display's session key. A key that fails to unwrap
    /// violates the session; a second key without a restart is refused.
    pub fn accept_wrapped_key(&mut self, wrapped: &WrappedKey) -> TransportResult<()> {
        self.ensure_not_violated()?;
        if self.session_key.is_some() {
            return Err(TransportError::UnexpectedFrame(
                "session key already exchanged".into(),
            ));
        }
        let keypair = self.keypair.as_ref().ok_or(TransportError::NotReady)?;

        match keypair.unwrap_session_key(wrapped) {
            Ok(key) => {
                self.session_key = Some(key);
                self.state.set(SideState::KeyExchanged);
                self.state.set(SideState::Ready);
                info!("host session ready");
                Ok(())
            }
            Err(err) => {
                self.violate("session key did not unwrap");
                Err(err.into())
            }
        }
    }

    /// Opens a sealed request. Any failure, including a request arriving
    /// before the key exchange, violates the session.
    pub fn open_request<T: DeserializeOwned>(&mut self, sealed: &EncryptedData) -> TransportResult<T> {
        self.ensure_not_violated()?;
        let Some(key) = self.session_key.as_ref() else {
            self.violate("sealed request before key exchange");
            return Err(TransportError::NotReady);
        };
        match open_json(key, sealed) {
            Ok(request) => Ok(request),
            Err(err) => {
                self.violate("sealed request failed to open");
                Err(err.into())
            }
        }
    }

    pub fn seal_response<T: Serialize + ?Sized>(&self, response: &T) -> TransportResult<EncryptedData> {
        self.ensure_not_violated()?;
        let key = self.session_key.as_ref().ok_or(TransportError::NotReady)?;
        Ok(seal_json(key, response)?)
    }

    fn violate(&mut self, reason: &'static str) {
        warn!(reason, "host session violated");
        self.session_key = None;
        self.state.set(SideState::Violated);
    }
}

impl Default for HostSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HostSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSession")
            .field("state", &self.state.get())
            .field("has_keypair", &self.keypair.is_some())
            .field("has_session_key", &self.session_key.is_some())
            .finish()
    }
}
