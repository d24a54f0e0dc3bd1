//! End-to-end: a crashed process left `a.sock` behind; starting the bridge
//! reclaims it and relays traffic to a TCP destination and back.

use sockbridge_core::{Bridge, Console, ForwardingRule, ShutdownHandler};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UnixStream};

#[tokio::test]
async fn stale_unix_source_is_reclaimed_and_relays() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("a.sock");
    drop(std::os::unix::net::UnixListener::bind(&sock).unwrap());
    assert!(sock.exists());

    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dest = upstream.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut s, _) = upstream.accept().await.unwrap();
        let mut buf = [0u8; 4];
        s.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
        s.write_all(b"pong").await.unwrap();
    });

    let mut bridge = Bridge::new(Console::plain());
    let shutdown = ShutdownHandler::new(bridge.registry(), Console::plain());
    bridge
        .bind_all(vec![ForwardingRule::parse(sock.to_str().unwrap(), &dest).unwrap()])
        .await
        .unwrap();

    let mut client = UnixStream::connect(&sock).await.unwrap();
    client.write_all(b"ping").await.unwrap();
    let mut reply = [0u8; 4];
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(&reply, b"pong");

    // Destination hung up: the client side is closed too.
    let mut rest = Vec::new();
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());

    bridge.run_until(async {}).await;
    let report = shutdown.cleanup().await;
    assert_eq!(report.removed, vec![sock.clone()]);
    assert!(!sock.exists());
}

#[tokio::test]
async fn live_unix_source_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("live.sock");
    let owner = tokio::net::UnixListener::bind(&sock).unwrap();

    let mut bridge = Bridge::new(Console::plain());
    let shutdown = ShutdownHandler::new(bridge.registry(), Console::plain());
    let err = bridge
        .bind_all(vec![ForwardingRule::parse(sock.to_str().unwrap(), ":9").unwrap()])
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), sockbridge_core::error::EXIT_BIND_CONFLICT);

    // The failed startup sweeps nothing that belongs to someone else.
    let report = shutdown.cleanup().await;
    assert!(report.removed.is_empty());
    assert!(sock.exists());

    let _client = UnixStream::connect(&sock).await.unwrap();
    assert!(owner.accept().await.is_ok());
}

#[tokio::test]
async fn tcp_source_to_unix_destination() {
    let dir = tempfile::tempdir().unwrap();
    let dest_sock = dir.path().join("backend.sock");
    let backend = tokio::net::UnixListener::bind(&dest_sock).unwrap();
    tokio::spawn(async move {
        let (mut s, _) = backend.accept().await.unwrap();
        let mut buf = vec![0u8; 5];
        s.read_exact(&mut buf).await.unwrap();
        s.write_all(&buf).await.unwrap();
    });

    let mut bridge = Bridge::new(Console::plain());
    let bound = bridge
        .bind_all(vec![ForwardingRule::parse("127.0.0.1:0", dest_sock.to_str().unwrap()).unwrap()])
        .await
        .unwrap();

    let target = bound[0].to_string();
    let mut client = tokio::net::TcpStream::connect(target).await.unwrap();
    client.write_all(b"hello").await.unwrap();
    let mut reply = [0u8; 5];
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(&reply, b"hello");
}
