#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub struct RunningRelay {
    pub addr: std::net::SocketAddr,
    pub samples: tokio::sync::mpsc::UnboundedReceiver<tcpinfo_relay::Sample>,
    pub server: tokio::task::JoinHandle<Result<(), tcpinfo_relay::RelayError>>,
}

impl Drop for RunningRelay {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Relay listening on an ephemeral loopback port, reporting into a channel
pub async fn start_relay(destination: impl Into<String>, interval: Duration) -> RunningRelay {
    let config = tcpinfo_relay::Config::new("127.0.0.1:0".parse().unwrap(), destination)
        .with_report_interval(interval)
        .with_connect_timeout(Duration::from_secs(2));
    start_relay_with(config).await
}

pub async fn start_relay_with(config: tcpinfo_relay::Config) -> RunningRelay {
    let (sink, samples) = tcpinfo_relay::ChannelSink::channel();

    let dispatcher = tcpinfo_relay::Dispatcher::bind(config, Arc::new(sink))
        .await
        .unwrap();
    let addr = dispatcher.local_addr().unwrap();
    let server = tokio::spawn(dispatcher.serve());

    RunningRelay {
        addr,
        samples,
        server,
    }
}

/// Destination that echoes everything back and closes when the client does
pub async fn echo_server() -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let (mut read, mut write) = stream.split();
                let _ = tokio::io::copy(&mut read, &mut write).await;
                let _ = write.shutdown().await;
            });
        }
    });

    addr
}

/// Destination that reads one connection to EOF and hands over what it got
pub async fn collecting_server() -> (std::net::SocketAddr, tokio::sync::oneshot::Receiver<Vec<u8>>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        let _ = tx.send(received);
    });

    (addr, rx)
}

/// Destination that reads one connection to EOF, reports what it got and
/// keeps its socket open for `hold` afterwards
pub async fn lingering_server(
    hold: Duration,
) -> (std::net::SocketAddr, tokio::sync::oneshot::Receiver<Vec<u8>>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        let _ = tx.send(received);
        tokio::time::sleep(hold).await;
        drop(stream);
    });

    (addr, rx)
}

/// Listener whose accept queue is full and is never drained, so a further
/// connect to it hangs instead of completing or being refused
///
/// The listener and the queued connections must be kept alive by the caller.
pub async fn saturated_listener() -> (tokio::net::TcpListener, Vec<tokio::net::TcpStream>) {
    let socket = tokio::net::TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let listener = socket.listen(1).unwrap();
    let addr = listener.local_addr().unwrap();

    let mut queued = Vec::new();
    loop {
        let connect = tokio::net::TcpStream::connect(addr);
        match tokio::time::timeout(Duration::from_millis(300), connect).await {
            Ok(Ok(stream)) => queued.push(stream),
            Ok(Err(e)) => panic!("connect to saturated listener failed: {e}"),
            // this connect hung: the queue is full
            Err(_) => break,
        }
        assert!(queued.len() < 64, "accept queue never filled up");
    }

    (listener, queued)
}

/// An address nothing listens on
pub async fn unreachable_addr() -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub async fn next_sample(
    samples: &mut tokio::sync::mpsc::UnboundedReceiver<tcpinfo_relay::Sample>,
) -> tcpinfo_relay::Sample {
    tokio::time::timeout(Duration::from_secs(2), samples.recv())
        .await
        .expect("no sample within 2s")
        .expect("sample channel closed")
}

pub fn drain(
    samples: &mut tokio::sync::mpsc::UnboundedReceiver<tcpinfo_relay::Sample>,
) -> Vec<tcpinfo_relay::Sample> {
    let mut drained = Vec::new();
    while let Ok(sample) = samples.try_recv() {
        drained.push(sample);
    }
    drained
}
