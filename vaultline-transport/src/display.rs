//! Display side of the session.

use crate::error::{TransportError, TransportResult};
use crate::state::{ReadinessWatch, SideState, StateCell};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use vaultline_crypto::{
    DerivedKey, EncryptedData, WrappedKey, generate_random_key, open_json, public_key_from_der,
    seal_json, wrap_session_key,
};

pub struct DisplaySession {
    session_key: Option<DerivedKey>,
    state: StateCell,
}

impl DisplaySession {
    pub fn new() -> Self {
        Self {
            session_key: None,
            state: StateCell::new("display"),
        }
    }

    pub fn state(&self) -> SideState {
        self.state.get()
    }

    pub fn subscribe(&self) -> ReadinessWatch {
        self.state.watch()
    }

    /// Generates a fresh session key and wraps it to the host public key.
    /// Refused once the session is ready; the host keeps its key until it
    /// restarts, so call [`reset`](Self::reset) only after a host restart.
    pub fn begin_key_exchange(&mut self, host_public_der: &[u8]) -> TransportResult<WrappedKey> {
        if self.state.get() == SideState::Ready {
            return Err(TransportError::UnexpectedFrame(
                "session key already exchanged".into(),
            ));
        }
        let host_public = public_key_from_der(host_public_der)?;
        let key = generate_random_key();
        let wrapped = wrap_session_key(&key, &host_public)?;
        self.session_key = Some(key);
        self.state.set(SideState::KeyExchanged);
        Ok(wrapped)
    }

    /// Called when the host acknowledges the key.
    pub fn confirm_key_accepted(&mut self) -> TransportResult<()> {
        match self.state.get() {
            SideState::KeyExchanged => {
                self.state.set(SideState::Ready);
                info!("display session ready");
                Ok(())
            }
            SideState::Ready => Ok(()),
            SideState::Violated => Err(TransportError::Violated),
            _ => Err(TransportError::UnexpectedFrame(
                "key accepted before a key was sent".into(),
            )),
        }
    }

    fn ready_key(&self) -> TransportResult<&DerivedKey> {
        match self.state.get() {
            SideState::Ready => self.session_key.as_ref().ok_or(TransportError::NotReady),
            SideState::Violated => Err(TransportError::Violated),
            _ => Err(TransportError::NotReady),
        }
    }

    /// Seals a request. Fails fast with `NotReady` before the handshake
    /// completes.
    pub fn seal_request<T: Serialize + ?Sized>(&self, request: &T) -> TransportResult<EncryptedData> {
        let key = self.ready_key()?;
        Ok(seal_json(key, request)?)
    }

    pub fn open_response<T: DeserializeOwned>(&mut self, sealed: &EncryptedData) -> TransportResult<T> {
        let key = self.ready_key()?;
        match open_json(key, sealed) {
            Ok(response) => Ok(response),
            Err(err) => {
                self.mark_violated("sealed response failed to open");
                Err(err.into())
            }
        }
    }

    /// Drops the session key after a violation on either side.
    pub fn mark_violated(&mut self, reason: &'static str) {
        warn!(reason, "display session violated");
        self.session_key = None;
        self.state.set(SideState::Violated);
    }

    /// Returns to `Idle`, e.g. after the host restarted.
    pub fn reset(&mut self) {
        self.session_key = None;
        self.state.set(SideState::Idle);
    }
}

impl Default for DisplaySession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DisplaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplaySession")
            .field("state", &self.state.get())
            .field("has_session_key", &self.session_key.is_some())
            .finish()
    }
}
