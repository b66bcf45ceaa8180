mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Listener whose first accept fails with the given error
struct FlakyListener {
    listener: tokio::net::TcpListener,
    failure: Option<std::io::Error>,
}

impl tcpinfo_relay::Acceptor for FlakyListener {
    async fn accept(&mut self) -> std::io::Result<(tokio::net::TcpStream, std::net::SocketAddr)> {
        if let Some(e) = self.failure.take() {
            return Err(e);
        }
        self.listener.accept().await
    }

    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

async fn serve_flaky(
    failure: std::io::Error,
    destination: std::net::SocketAddr,
) -> (
    std::net::SocketAddr,
    tokio::task::JoinHandle<Result<(), tcpinfo_relay::RelayError>>,
) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = tcpinfo_relay::Config::new(listener.local_addr().unwrap(), destination.to_string())
        .with_report_interval(Duration::from_secs(3600));
    let (sink, _samples) = tcpinfo_relay::ChannelSink::channel();

    let dispatcher = tcpinfo_relay::Dispatcher::new(
        FlakyListener {
            listener,
            failure: Some(failure),
        },
        Arc::new(config),
        Arc::new(sink),
    )
    .unwrap();
    let addr = dispatcher.local_addr().unwrap();
    (addr, tokio::spawn(dispatcher.serve()))
}

#[tokio::test]
async fn test_transient_accept_error_is_survived() {
    let destination = common::echo_server().await;
    let (addr, server) = serve_flaky(
        std::io::Error::from(std::io::ErrorKind::ConnectionAborted),
        destination,
    )
    .await;

    let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
    client.write_all(b"still here").await.unwrap();
    let mut buf = [0u8; 10];
    tokio::time::timeout(Duration::from_secs(2), client.read_exact(&mut buf))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(&buf, b"still here");
    assert!(!server.is_finished());
    server.abort();
}

#[cfg(unix)]
#[tokio::test]
async fn test_descriptor_exhaustion_backs_off_and_recovers() {
    let destination = common::echo_server().await;
    let (addr, server) =
        serve_flaky(std::io::Error::from_raw_os_error(libc::EMFILE), destination).await;

    let started = tokio::time::Instant::now();
    let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
    client.write_all(b"x").await.unwrap();
    let mut buf = [0u8; 1];
    tokio::time::timeout(Duration::from_secs(2), client.read_exact(&mut buf))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(&buf, b"x");
    assert!(started.elapsed() >= Duration::from_millis(90));
    server.abort();
}

#[tokio::test]
async fn test_fatal_accept_error_ends_serve() {
    let destination = common::echo_server().await;
    let (_addr, server) = serve_flaky(
        std::io::Error::from(std::io::ErrorKind::InvalidInput),
        destination,
    )
    .await;

    let result = tokio::time::timeout(Duration::from_secs(2), server)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(tcpinfo_relay::RelayError::Accept { .. })));
}
