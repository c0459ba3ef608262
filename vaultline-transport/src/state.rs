//! Per-side session state and readiness notifications.

use crate::error::{TransportError, TransportResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

/// Where one side of the session is in the handshake.
///
/// `Idle → KeypairReady (host only) → KeyExchanged → Ready`. `Violated` is
/// terminal for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SideState {
    Idle,
    KeypairReady,
    KeyExchanged,
    Ready,
    Violated,
}

impl SideState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for SideState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::KeypairReady => "keypair-ready",
            Self::KeyExchanged => "key-exchanged",
            Self::Ready => "ready",
            Self::Violated => "violated",
        };
        f.write_str(s)
    }
}

/// Publisher half, owned by a session.
#[derive(Debug)]
pub(crate) struct StateCell {
    side: &'static str,
    tx: watch::Sender<SideState>,
}

impl StateCell {
    pub(crate) fn new(side: &'static str) -> Self {
        let (tx, _) = watch::channel(SideState::Idle);
        Self { side, tx }
    }

    pub(crate) fn get(&self) -> SideState {
        *self.tx.borrow()
    }

    pub(crate) fn set(&self, state: SideState) {
        let previous = self.tx.send_replace(state);
        if previous != state {
            tracing::debug!(side = self.side, from = %previous, to = %state, "session state changed");
        }
    }

    pub(crate) fn watch(&self) -> ReadinessWatch {
        ReadinessWatch {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observer of one side's state. Cloneable; every clone sees every change
/// made after it was created, but intermediate states may be skipped.
#[derive(Debug, Clone)]
pub struct ReadinessWatch {
    rx: watch::Receiver<SideState>,
}

impl ReadinessWatch {
    pub fn state(&self) -> SideState {
        *self.rx.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Waits for the next state change and returns the new state.
    pub async fn changed(&mut self) -> TransportResult<SideState> {
        self.rx
            .changed()
            .await
            .map_err(|_| TransportError::ChannelClosed)?;
        Ok(*self.rx.borrow_and_update())
    }

    /// Resolves once the side is `Ready`. Fails if it is violated first or
    /// the session is dropped.
    pub async fn wait_ready(&mut self) -> TransportResult<()> {
        let state = self
            .rx
            .wait_for(|s| matches!(s, SideState::Ready | SideState::Violated))
            .await
            .map_err(|_| TransportError::ChannelClosed)?;
        match *state {
            SideState::Ready => Ok(()),
            _ => Err(TransportError::Violated),
        }
    }
}

/// The session as a whole is ready only when both sides are.
pub fn both_ready(host: &ReadinessWatch, display: &ReadinessWatch) -> bool {
    host.is_ready() && display.is_ready()
}
