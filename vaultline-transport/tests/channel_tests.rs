use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use vaultline_transport::{
    Frame, FrameErrorKind, RequestHandler, SideState, TransportError, both_ready, pair,
};

#[derive(Debug, Serialize, Deserialize)]
struct Ping {
    n: u32,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Pong {
    n: u32,
}

struct Doubler;

#[async_trait]
impl RequestHandler for Doubler {
    type Request = Ping;
    type Response = Pong;

    async fn handle(&self, request: Ping) -> Pong {
        Pong { n: request.n * 2 }
    }
}

// ── Happy path ──────────────────────────────────────────────────

#[tokio::test]
async fn handshake_then_calls() {
    let (mut host, mut display) = pair(8);
    let mut host_watch = host.readiness();
    let server = tokio::spawn(async move { host.serve(&Doubler).await });

    display.handshake().await.unwrap();
    host_watch.wait_ready().await.unwrap();
    assert!(both_ready(&host_watch, &display.readiness()));

    for n in [1, 21] {
        let pong: Pong = display.call(&Ping { n }).await.unwrap();
        assert_eq!(pong, Pong { n: n * 2 });
    }

    drop(display);
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn second_handshake_leaves_session_usable() {
    let (mut host, mut display) = pair(8);
    let server = tokio::spawn(async move { host.serve(&Doubler).await });

    display.handshake().await.unwrap();
    let err = display.handshake().await.unwrap_err();
    assert!(matches!(err, TransportError::UnexpectedFrame(_)));
    assert_eq!(display.session().state(), SideState::Ready);

    let pong: Pong = display.call(&Ping { n: 4 }).await.unwrap();
    assert_eq!(pong, Pong { n: 8 });

    drop(display);
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn call_before_handshake_fails_fast() {
    let (_host, mut display) = pair(1);
    let err = display.call::<_, Pong>(&Ping { n: 1 }).await.unwrap_err();
    assert!(matches!(err, TransportError::NotReady));
}

#[tokio::test]
async fn public_key_query_is_plaintext() {
    let (mut host, mut display) = pair(4);
    let server = tokio::spawn(async move { host.serve(&Doubler).await });
    let der = display.query_public_key().await.unwrap();
    assert_eq!(der.len(), 44);
    assert_eq!(display.session().state(), SideState::Idle);
    drop(display);
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn unexpected_frames_are_answered_not_fatal() {
    let (mut host, mut display) = pair(4);
    let server = tokio::spawn(async move { host.serve(&Doubler).await });

    display.send_frame(&Frame::KeyAccepted).await.unwrap();
    match display.recv_frame().await.unwrap() {
        Frame::Error { kind, .. } => assert_eq!(kind, FrameErrorKind::UnexpectedFrame),
        other => panic!("expected error frame, got {other:?}"),
    }

    display.handshake().await.unwrap();
    let pong: Pong = display.call(&Ping { n: 4 }).await.unwrap();
    assert_eq!(pong.n, 8);
    drop(display);
    server.await.unwrap().unwrap();
}

// ── Violations ──────────────────────────────────────────────────

#[tokio::test]
async fn sealed_frame_before_handshake_drops_session() {
    let (mut host, mut display) = pair(4);
    let server = tokio::spawn(async move { host.serve(&Doubler).await });

    display
        .send_frame(&Frame::Sealed(vaultline_crypto::EncryptedData {
            iv: vec![0; 12],
            data: vec![0; 32],
        }))
        .await
        .unwrap();
    match display.recv_frame().await.unwrap() {
        Frame::Error { kind, .. } => assert_eq!(kind, FrameErrorKind::NotReady),
        other => panic!("expected error frame, got {other:?}"),
    }
    assert!(matches!(
        server.await.unwrap(),
        Err(TransportError::NotReady)
    ));
}

#[tokio::test]
async fn undecryptable_request_drops_session() {
    let (mut host, mut display) = pair(4);
    let mut host_watch = host.readiness();
    let server = tokio::spawn(async move {
        let result = host.serve(&Doubler).await;
        (host, result)
    });

    display.handshake().await.unwrap();
    display
        .send_frame(&Frame::Sealed(vaultline_crypto::EncryptedData {
            iv: vec![7; 12],
            data: vec![7; 40],
        }))
        .await
        .unwrap();

    let (mut host, result) = server.await.unwrap();
    assert!(matches!(result, Err(TransportError::AuthFailure)));
    assert_eq!(host_watch.changed().await.unwrap(), SideState::Violated);

    // The display learns about it from the error frame on its next call.
    let err = display.call::<_, Pong>(&Ping { n: 1 }).await.unwrap_err();
    assert!(matches!(
        err,
        TransportError::Remote {
            kind: FrameErrorKind::AuthFailure,
            ..
        }
    ));
    assert_eq!(display.session().state(), SideState::Violated);

    // After a restart, a fresh handshake works again.
    host.restart();
    let server = tokio::spawn(async move { host.serve(&Doubler).await });
    display.reset();
    display.handshake().await.unwrap();
    let pong: Pong = display.call(&Ping { n: 5 }).await.unwrap();
    assert_eq!(pong.n, 10);
    drop(display);
    server.await.unwrap().unwrap();
}
