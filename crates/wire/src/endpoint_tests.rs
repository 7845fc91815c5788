// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    loopback = { "tcp", "127.0.0.1:5556", "tcp://127.0.0.1:5556" },
    wildcard = { "tcp", "*:5557", "tcp://0.0.0.0:5557" },
    bare_port = { "tcp", ":9100", "tcp://0.0.0.0:9100" },
    ipc_path = { "ipc", "/tmp/dashcorn-pm.sock", "ipc:///tmp/dashcorn-pm.sock" },
)]
fn endpoint_forms(protocol: &str, address: &str, display: &str) {
    let endpoint = Endpoint::new(protocol, address).unwrap();
    assert_eq!(endpoint.to_string(), display);
}

#[test]
fn parse_splits_protocol_and_address() {
    assert_eq!(
        Endpoint::parse("tcp://127.0.0.1:5556").unwrap(),
        Endpoint::Tcp { host: "127.0.0.1".into(), port: 5556 }
    );
    assert_eq!(
        Endpoint::parse("ipc:///tmp/pm.sock").unwrap(),
        Endpoint::Ipc { path: "/tmp/pm.sock".into() }
    );
}

#[test]
fn bad_forms_are_rejected() {
    assert!(matches!(
        Endpoint::new("udp", "127.0.0.1:5556"),
        Err(EndpointError::UnsupportedProtocol(_))
    ));
    assert!(matches!(
        Endpoint::new("tcp", "no-port-here"),
        Err(EndpointError::InvalidTcpAddress(_))
    ));
    assert!(matches!(
        Endpoint::new("tcp", "host:not-a-number"),
        Err(EndpointError::InvalidTcpAddress(_))
    ));
    assert!(matches!(Endpoint::parse("garbage"), Err(EndpointError::InvalidEndpoint(_))));
}

#[test]
fn ipc_path_never_grows_a_port() {
    // The address-only shape: a path with a colon stays a path.
    let endpoint = Endpoint::new("ipc", "/tmp/dash:5556").unwrap();
    assert_eq!(endpoint, Endpoint::Ipc { path: "/tmp/dash:5556".into() });
}

#[test]
fn refresh_missing_path_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.sock");
    refresh_ipc_socket(&path, true).unwrap();
}

#[test]
fn refresh_refuses_regular_files_in_strict_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not-a-socket");
    std::fs::write(&path, b"data").unwrap();

    let err = refresh_ipc_socket(&path, true).unwrap_err();
    assert!(matches!(err, EndpointError::NotASocket(_)));
    assert!(path.exists());

    // Non-strict mode removes whatever is in the way.
    refresh_ipc_socket(&path, false).unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn refresh_removes_stale_socket_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stale.sock");
    drop(UnixListener::bind(&path).unwrap());
    assert!(path.exists());

    refresh_ipc_socket(&path, true).unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn bind_over_a_stale_socket_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reuse.sock");
    drop(UnixListener::bind(&path).unwrap());

    let endpoint = Endpoint::Ipc { path: path.clone() };
    let listener = endpoint.bind().await.unwrap();
    assert_eq!(listener.local_endpoint(), Some(endpoint));
}

#[tokio::test]
async fn tcp_roundtrip_over_an_ephemeral_port() {
    let endpoint = Endpoint::new("tcp", "127.0.0.1:0").unwrap();
    let listener = endpoint.bind().await.unwrap();
    let bound = listener.local_endpoint().unwrap();

    let server = tokio::spawn(async move {
        let mut conn = listener.accept().await.unwrap();
        crate::frame::read_message(&mut conn).await.unwrap()
    });

    let mut client = bound.connect().await.unwrap();
    crate::frame::write_message(&mut client, b"ping").await.unwrap();
    assert_eq!(server.await.unwrap(), b"ping");
}
