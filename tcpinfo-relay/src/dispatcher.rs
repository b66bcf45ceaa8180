//! Accept loop: one relay and one reporter per accepted connection

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::Config;
use crate::error::RelayError;
use crate::relay::Relay;
use crate::reporter::{ConnectionInfo, Reporter};
use crate::sink::ReportSink;

/// Pause before accepting again when the process is out of descriptors or memory
const RESOURCE_BACKOFF: Duration = Duration::from_millis(100);

/// Source of inbound connections
pub trait Acceptor: Send {
    fn accept(
        &mut self,
    ) -> impl Future<Output = std::io::Result<(tokio::net::TcpStream, std::net::SocketAddr)>> + Send;

    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr>;
}

impl Acceptor for tokio::net::TcpListener {
    fn accept(
        &mut self,
    ) -> impl Future<Output = std::io::Result<(tokio::net::TcpStream, std::net::SocketAddr)>> + Send
    {
        tokio::net::TcpListener::accept(self)
    }

    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        tokio::net::TcpListener::local_addr(self)
    }
}

pub struct Dispatcher<A = tokio::net::TcpListener> {
    acceptor: A,
    config: Arc<Config>,
    sink: Arc<dyn ReportSink>,
    next_connection: AtomicU64,
}

impl Dispatcher<tokio::net::TcpListener> {
    /// Validate `config` and listen on `config.listen`
    pub async fn bind(config: Config, sink: Arc<dyn ReportSink>) -> Result<Self, RelayError> {
        config.validate()?;

        let listener = tokio::net::TcpListener::bind(config.listen)
            .await
            .map_err(|source| RelayError::Bind {
                addr: config.listen,
                source,
            })?;

        Self::new(listener, Arc::new(config), sink)
    }
}

impl<A: Acceptor> Dispatcher<A> {
    /// Serve connections from `acceptor`; fails if `config` does not validate
    pub fn new(
        acceptor: A,
        config: Arc<Config>,
        sink: Arc<dyn ReportSink>,
    ) -> Result<Self, RelayError> {
        config.validate()?;

        Ok(Self {
            acceptor,
            config,
            sink,
            next_connection: AtomicU64::new(1),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.acceptor.local_addr()
    }

    /// Accept connections until a fatal accept error
    ///
    /// Every accepted connection is handled on its own task, so a slow
    /// destination never delays the next accept.
    pub async fn serve(mut self) -> Result<(), RelayError> {
        if let Ok(addr) = self.acceptor.local_addr() {
            tracing::info!(
                listen = %addr,
                destination = %self.config.destination,
                "relay listening"
            );
        }

        loop {
            let (inbound, client) = match self.acceptor.accept().await {
                Ok(accepted) => accepted,
                Err(e) if is_transient_accept_error(&e) => {
                    tracing::warn!(error = %e, "accept failed, retrying");
                    if is_resource_exhaustion(&e) {
                        tokio::time::sleep(RESOURCE_BACKOFF).await;
                    }
                    continue;
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed, stopping");
                    return Err(RelayError::Accept { source: e });
                }
            };

            let connection = self.next_connection.fetch_add(1, Ordering::Relaxed);
            let config = self.config.clone();
            let sink = self.sink.clone();

            tokio::spawn(async move {
                handle_connection(connection, inbound, client, config, sink).await;
            });
        }
    }
}

async fn handle_connection(
    connection: u64,
    inbound: tokio::net::TcpStream,
    client: std::net::SocketAddr,
    config: Arc<Config>,
    sink: Arc<dyn ReportSink>,
) {
    tracing::info!(connection, %client, "accepted connection");

    let outbound = match dial(&config).await {
        Ok(stream) => Some(stream),
        Err(e) => {
            tracing::error!(
                connection,
                destination = %config.destination,
                error = %e,
                "failed to connect to destination"
            );
            None
        }
    };

    let probe = match &outbound {
        Some(stream) => match tcpinfo_sock::SocketProbe::duplicate(stream) {
            Ok(probe) => Some(probe),
            Err(e) => {
                tracing::warn!(connection, error = %e, "cannot attach probe to destination socket");
                None
            }
        },
        None => None,
    };

    let cancel = tokio_util::sync::CancellationToken::new();
    let info = ConnectionInfo {
        connection,
        client,
        destination: config.destination.clone(),
    };
    tokio::spawn(Reporter::new(probe, info, config.report_interval, sink, cancel.clone()).run());

    let stats = Relay::new(connection, inbound, outbound, cancel, config.drain_timeout)
        .run()
        .await;

    tracing::info!(
        connection,
        to_destination = stats.to_destination,
        to_client = stats.to_client,
        "connection closed"
    );
}

async fn dial(config: &Config) -> std::io::Result<tokio::net::TcpStream> {
    let connect = tokio::net::TcpStream::connect(config.destination.as_str());
    match config.connect_timeout {
        Some(limit) => tokio::time::timeout(limit, connect).await.map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("no connection after {limit:?}"),
            )
        })?,
        None => connect.await,
    }
}

/// Whether the accept loop should keep going after `error`
///
/// Errors tied to one half-open connection or to a momentary shortage of
/// descriptors or memory are transient. Anything else means the listener
/// itself is broken.
pub fn is_transient_accept_error(error: &std::io::Error) -> bool {
    use std::io::ErrorKind;

    matches!(
        error.kind(),
        ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    ) || is_resource_exhaustion(error)
}

#[cfg(unix)]
fn is_resource_exhaustion(error: &std::io::Error) -> bool {
    matches!(
        error.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM)
    )
}

#[cfg(not(unix))]
fn is_resource_exhaustion(error: &std::io::Error) -> bool {
    error.kind() == std::io::ErrorKind::OutOfMemory
}
