//! Byte-transparent copying between a client and the destination
//!
//! Two independent tasks copy the two directions. Whichever direction ends
//! first cancels the connection's reporter: a client that has finished sending
//! stops sampling even while the destination keeps its socket open.
//!
//! The relay itself lasts until the destination→client direction ends, so a
//! response keeps flowing after the client's EOF. Both sockets are closed on
//! every exit path: once destination→client has ended, client→destination gets
//! `drain_timeout` to finish on its own before it is aborted.

use std::time::Duration;

use tokio::io::AsyncWriteExt;

/// Bytes copied in each direction
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Client → destination. Zero if that direction had to be aborted.
    pub to_destination: u64,
    /// Destination → client
    pub to_client: u64,
}

pub struct Relay {
    connection: u64,
    inbound: tokio::net::TcpStream,
    /// `None` when dialing the destination failed
    outbound: Option<tokio::net::TcpStream>,
    cancel: tokio_util::sync::CancellationToken,
    drain_timeout: Duration,
}

impl Relay {
    pub fn new(
        connection: u64,
        inbound: tokio::net::TcpStream,
        outbound: Option<tokio::net::TcpStream>,
        cancel: tokio_util::sync::CancellationToken,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            connection,
            inbound,
            outbound,
            cancel,
            drain_timeout,
        }
    }

    pub async fn run(self) -> RelayStats {
        let connection = self.connection;

        let Some(outbound) = self.outbound else {
            // nothing to relay to: close the client side and stop the reporter
            self.cancel.cancel();
            let mut inbound = self.inbound;
            if let Err(e) = inbound.shutdown().await {
                tracing::debug!(connection, error = %e, "client shutdown failed");
            }
            tracing::debug!(connection, "closed client without destination");
            return RelayStats::default();
        };

        let (mut inbound_read, mut inbound_write) = self.inbound.into_split();
        let (mut outbound_read, mut outbound_write) = outbound.into_split();

        let client_done = self.cancel.clone();
        let mut upstream = tokio::spawn(async move {
            let copied = tokio::io::copy(&mut inbound_read, &mut outbound_write).await;
            client_done.cancel();
            // pass the client's EOF on to the destination
            let _ = outbound_write.shutdown().await;
            copied
        });

        let downstream = tokio::spawn(async move {
            let copied = tokio::io::copy(&mut outbound_read, &mut inbound_write).await;
            let _ = inbound_write.shutdown().await;
            copied
        });

        let to_client = copied_bytes(connection, "destination→client", downstream.await);
        self.cancel.cancel();

        let to_destination = match tokio::time::timeout(self.drain_timeout, &mut upstream).await {
            Ok(joined) => copied_bytes(connection, "client→destination", joined),
            Err(_) => {
                tracing::debug!(
                    connection,
                    drain_timeout = ?self.drain_timeout,
                    "client→destination still open after destination finished, closing"
                );
                upstream.abort();
                0
            }
        };

        RelayStats {
            to_destination,
            to_client,
        }
    }
}

fn copied_bytes(
    connection: u64,
    direction: &'static str,
    joined: Result<std::io::Result<u64>, tokio::task::JoinError>,
) -> u64 {
    match joined {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            tracing::debug!(connection, direction, error = %e, "copy ended with error");
            0
        }
        Err(e) => {
            tracing::warn!(connection, direction, error = %e, "copy task failed");
            0
        }
    }
}
