use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use vaultline_transport::{DisplaySession, HostSession, SideState, TransportError, both_ready};

fn handshaken() -> (HostSession, DisplaySession) {
    let mut host = HostSession::new();
    host.start();
    let mut display = DisplaySession::new();
    let wrapped = display
        .begin_key_exchange(&host.public_key_der().unwrap())
        .unwrap();
    host.accept_wrapped_key(&wrapped).unwrap();
    display.confirm_key_accepted().unwrap();
    (host, display)
}

// ── Handshake ───────────────────────────────────────────────────

#[test]
fn states_follow_the_handshake() {
    let mut host = HostSession::new();
    let mut display = DisplaySession::new();
    let host_watch = host.subscribe();
    let display_watch = display.subscribe();
    assert_eq!(host.state(), SideState::Idle);
    assert!(matches!(host.public_key_der(), Err(TransportError::NotReady)));

    host.start();
    assert_eq!(host.state(), SideState::KeypairReady);

    let der = host.public_key_der().unwrap();
    assert_eq!(der.len(), 44);
    let wrapped = display.begin_key_exchange(&der).unwrap();
    assert_eq!(display.state(), SideState::KeyExchanged);
    assert!(!both_ready(&host_watch, &display_watch));

    host.accept_wrapped_key(&wrapped).unwrap();
    assert_eq!(host.state(), SideState::Ready);
    assert!(!both_ready(&host_watch, &display_watch));

    display.confirm_key_accepted().unwrap();
    assert!(both_ready(&host_watch, &display_watch));
}

#[test]
fn sealed_round_trip_after_handshake() {
    let (mut host, mut display) = handshaken();
    let sealed = display.seal_request(&json!({"op": "listStorages"})).unwrap();
    let request: Value = host.open_request(&sealed).unwrap();
    assert_eq!(request["op"], "listStorages");

    let reply = host.seal_response(&json!({"status": "ok"})).unwrap();
    let response: Value = display.open_response(&reply).unwrap();
    assert_eq!(response, json!({"status": "ok"}));
}

#[test]
fn display_fails_fast_before_ready() {
    let mut host = HostSession::new();
    host.start();
    let mut display = DisplaySession::new();
    assert!(matches!(
        display.seal_request(&json!({})),
        Err(TransportError::NotReady)
    ));

    display
        .begin_key_exchange(&host.public_key_der().unwrap())
        .unwrap();
    assert!(matches!(
        display.seal_request(&json!({})),
        Err(TransportError::NotReady)
    ));
}

#[test]
fn second_wrapped_key_is_refused_without_restart() {
    let (mut host, _) = handshaken();
    let mut other = DisplaySession::new();
    let wrapped = other
        .begin_key_exchange(&host.public_key_der().unwrap())
        .unwrap();
    assert!(matches!(
        host.accept_wrapped_key(&wrapped),
        Err(TransportError::UnexpectedFrame(_))
    ));
    assert_eq!(host.state(), SideState::Ready);
}

#[test]
fn ready_display_keeps_its_key_when_asked_to_exchange_again() {
    let (mut host, mut display) = handshaken();
    assert!(matches!(
        display.begin_key_exchange(&host.public_key_der().unwrap()),
        Err(TransportError::UnexpectedFrame(_))
    ));
    assert_eq!(display.state(), SideState::Ready);

    let sealed = display.seal_request(&json!({"op": "signOut"})).unwrap();
    let request: Value = host.open_request(&sealed).unwrap();
    assert_eq!(request["op"], "signOut");
}

#[test]
fn garbage_der_is_rejected() {
    let mut display = DisplaySession::new();
    assert!(display.begin_key_exchange(&[0u8; 44]).is_err());
    assert_eq!(display.state(), SideState::Idle);
}

// ── Violations ──────────────────────────────────────────────────

#[test]
fn tampered_request_violates_host() {
    let (mut host, display) = handshaken();
    let mut sealed = display.seal_request(&json!({"op": "x"})).unwrap();
    sealed.data[0] ^= 0x01;

    assert!(matches!(
        host.open_request::<Value>(&sealed),
        Err(TransportError::AuthFailure)
    ));
    assert_eq!(host.state(), SideState::Violated);

    // Not auto-healed: even a valid request is refused now.
    let valid = display.seal_request(&json!({"op": "x"})).unwrap();
    assert!(matches!(
        host.open_request::<Value>(&valid),
        Err(TransportError::Violated)
    ));
}

#[test]
fn request_before_key_exchange_violates_host() {
    let mut host = HostSession::new();
    host.start();
    let (_, display) = handshaken();
    let sealed = display.seal_request(&json!({})).unwrap();
    assert!(matches!(
        host.open_request::<Value>(&sealed),
        Err(TransportError::NotReady)
    ));
    assert_eq!(host.state(), SideState::Violated);
}

#[test]
fn response_under_wrong_key_violates_display() {
    let (_, mut display) = handshaken();
    let (other_host, _) = handshaken();
    let foreign = other_host.seal_response(&json!({"status": "ok"})).unwrap();
    assert!(matches!(
        display.open_response::<Value>(&foreign),
        Err(TransportError::AuthFailure)
    ));
    assert_eq!(display.state(), SideState::Violated);
}

#[test]
fn restart_requires_a_new_exchange() {
    let mut host = HostSession::new();
    host.start();
    let old_der = host.public_key_der().unwrap();
    let mut display = DisplaySession::new();
    let stale = display.begin_key_exchange(&old_der).unwrap();

    host.start();
    assert_ne!(host.public_key_der().unwrap(), old_der);
    assert!(matches!(
        host.accept_wrapped_key(&stale),
        Err(TransportError::AuthFailure)
    ));

    host.start();
    assert_eq!(host.state(), SideState::KeypairReady);
    display.reset();
    let fresh = display
        .begin_key_exchange(&host.public_key_der().unwrap())
        .unwrap();
    host.accept_wrapped_key(&fresh).unwrap();
    assert_eq!(host.state(), SideState::Ready);
}
