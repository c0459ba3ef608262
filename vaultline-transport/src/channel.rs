//! In-process duplex carrying JSON frames between the two sessions.

use crate::display::DisplaySession;
use crate::error::{TransportError, TransportResult};
use crate::frame::{Frame, FrameErrorKind};
use crate::host::HostSession;
use crate::state::ReadinessWatch;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Serves decrypted requests on the host.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    type Request: DeserializeOwned + Send;
    type Response: Serialize + Send;

    async fn handle(&self, request: Self::Request) -> Self::Response;
}

/// Builds a connected host/display pair. The host session is started, so
/// its keypair already exists.
pub fn pair(buffer: usize) -> (HostEndpoint, DisplayEndpoint) {
    let (to_host, host_rx) = mpsc::channel(buffer);
    let (to_display, display_rx) = mpsc::channel(buffer);

    let mut session = HostSession::new();
    session.start();

    let host = HostEndpoint {
        session,
        tx: to_display,
        rx: host_rx,
    };
    let display = DisplayEndpoint {
        session: DisplaySession::new(),
        tx: to_host,
        rx: display_rx,
    };
    (host, display)
}

pub struct HostEndpoint {
    session: HostSession,
    tx: mpsc::Sender<String>,
    rx: mpsc::Receiver<String>,
}

impl HostEndpoint {
    pub fn session(&self) -> &HostSession {
        &self.session
    }

    pub fn readiness(&self) -> ReadinessWatch {
        self.session.subscribe()
    }

    /// Regenerates the keypair and discards frames still queued from the
    /// previous session. The display has to repeat the handshake.
    pub fn restart(&mut self) {
        let mut stale = 0usize;
        while self.rx.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!(stale, "discarded frames from previous session");
        }
        self.session.start();
    }

    async fn send(&self, frame: &Frame) -> TransportResult<()> {
        self.tx
            .send(frame.encode()?)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    /// Reports `err` to the display, then hands it back.
    async fn fail(&self, err: TransportError) -> TransportError {
        let frame = Frame::error(err.frame_kind(), err.to_string());
        if let Err(send_err) = self.send(&frame).await {
            debug!(error = %send_err, "could not report error to display");
        }
        err
    }

    /// Pumps frames until the display hangs up (`Ok`) or the session is
    /// violated (`Err`). A violated session answers with an error frame and
    /// stops; call [`restart`](Self::restart) before serving again.
    pub async fn serve<H: RequestHandler>(&mut self, handler: &H) -> TransportResult<()> {
        while let Some(raw) = self.rx.recv().await {
            let frame = match Frame::decode(&raw) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(error = %err, "dropping malformed frame");
                    self.send(&Frame::error(FrameErrorKind::Malformed, err.to_string()))
                        .await?;
                    continue;
                }
            };
            debug!(frame = frame.name(), "host received frame");

            match frame {
                Frame::PublicKeyQuery => match self.session.public_key_der() {
                    Ok(der) => self.send(&Frame::PublicKey { der }).await?,
                    Err(err) => return Err(self.fail(err).await),
                },
                Frame::WrappedKey(wrapped) => match self.session.accept_wrapped_key(&wrapped) {
                    Ok(()) => self.send(&Frame::KeyAccepted).await?,
                    Err(err @ TransportError::UnexpectedFrame(_)) => {
                        self.send(&Frame::error(err.frame_kind(), err.to_string()))
                            .await?;
                    }
                    Err(err) => return Err(self.fail(err).await),
                },
                Frame::Sealed(sealed) => {
                    let request = match self.session.open_request::<H::Request>(&sealed) {
                        Ok(request) => request,
                        Err(err) => return Err(self.fail(err).await),
                    };
                    let response = handler.handle(request).await;
                    let sealed = self.session.seal_response(&response)?;
                    self.send(&Frame::Sealed(sealed)).await?;
                }
                other => {
                    self.send(&Frame::error(
                        FrameErrorKind::UnexpectedFrame,
                        format!("host does not accept {}", other.name()),
                    ))
                    .await?;
                }
            }
        }
        debug!("display hung up");
        Ok(())
    }
}

impl std::fmt::Debug for HostEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostEndpoint")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

pub struct DisplayEndpoint {
    session: DisplaySession,
    tx: mpsc::Sender<String>,
    rx: mpsc::Receiver<String>,
}

impl DisplayEndpoint {
    pub fn session(&self) -> &DisplaySession {
        &self.session
    }

    pub fn readiness(&self) -> ReadinessWatch {
        self.session.subscribe()
    }

    /// Sends a raw frame. Normal callers use [`handshake`](Self::handshake)
    /// and [`call`](Self::call).
    pub async fn send_frame(&self, frame: &Frame) -> TransportResult<()> {
        self.tx
            .send(frame.encode()?)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    pub async fn recv_frame(&mut self) -> TransportResult<Frame> {
        let raw = self.rx.recv().await.ok_or(TransportError::ChannelClosed)?;
        Frame::decode(&raw)
    }

    /// Receives the next frame, turning an error frame into `Remote`. An
    /// authentication or readiness error from the host means the host has
    /// dropped the session, so the local side follows.
    async fn expect_reply(&mut self) -> TransportResult<Frame> {
        match self.recv_frame().await? {
            Frame::Error { kind, message } => {
                if matches!(
                    kind,
                    FrameErrorKind::AuthFailure | FrameErrorKind::NotReady | FrameErrorKind::Violated
                ) {
                    self.session.mark_violated("host dropped the session");
                }
                Err(TransportError::Remote { kind, message })
            }
            frame => Ok(frame),
        }
    }

    /// The plaintext public-key query.
    pub async fn query_public_key(&mut self) -> TransportResult<Vec<u8>> {
        self.send_frame(&Frame::PublicKeyQuery).await?;
        match self.expect_reply().await? {
            Frame::PublicKey { der } => Ok(der),
            other => Err(TransportError::UnexpectedFrame(other.name().into())),
        }
    }

    /// Runs the full key exchange and resolves once both sides are ready.
    pub async fn handshake(&mut self) -> TransportResult<()> {
        let der = self.query_public_key().await?;
        let wrapped = self.session.begin_key_exchange(&der)?;
        self.send_frame(&Frame::WrappedKey(wrapped)).await?;
        match self.expect_reply().await? {
            Frame::KeyAccepted => self.session.confirm_key_accepted(),
            other => Err(TransportError::UnexpectedFrame(other.name().into())),
        }
    }

    /// Sends one sealed request and opens the sealed response.
    pub async fn call<Req, Resp>(&mut self, request: &Req) -> TransportResult<Resp>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let sealed = self.session.seal_request(request)?;
        self.send_frame(&Frame::Sealed(sealed)).await?;
        match self.expect_reply().await? {
            Frame::Sealed(sealed) => self.session.open_response(&sealed),
            other => Err(TransportError::UnexpectedFrame(other.name().into())),
        }
    }

    /// Forgets the session key so the next [`handshake`](Self::handshake)
    /// starts over, e.g. after a host restart.
    pub fn reset(&mut self) {
        self.session.reset();
    }
}

impl std::fmt::Debug for DisplayEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayEndpoint")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
