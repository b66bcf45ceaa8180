//! Periodic sampling of the destination leg of one connection

use std::sync::Arc;
use std::time::Duration;

use tcpinfo_sock::{SocketIntrospectable, SocketSnapshot};

use crate::sink::ReportSink;

/// Shortest interval a reporter samples at
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Identity of one relayed connection, attached to every sample
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConnectionInfo {
    /// Dispatcher-assigned id, unique for the life of the process
    pub connection: u64,
    /// Remote address of the accepted client
    pub client: std::net::SocketAddr,
    /// Configured destination
    pub destination: String,
}

/// One emitted record
#[derive(Debug, Clone, serde::Serialize)]
pub struct Sample {
    #[serde(flatten)]
    pub info: ConnectionInfo,
    /// 0 for the sample taken when the connection was established
    pub sequence: u64,
    pub taken_at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    pub snapshot: SocketSnapshot,
}

/// Samples a socket on a fixed interval until cancelled
///
/// The first sample is taken as soon as [`run`](Self::run) starts, then one per
/// interval tick. Samples never overlap. Cancellation is checked between
/// samples, never in the middle of one. A failed snapshot or a failed write
/// to the sink ends the reporter. A zero interval is raised to
/// [`MIN_INTERVAL`].
pub struct Reporter<P> {
    probe: P,
    info: ConnectionInfo,
    interval: Duration,
    sink: Arc<dyn ReportSink>,
    cancel: tokio_util::sync::CancellationToken,
}

impl<P: SocketIntrospectable> Reporter<P> {
    pub fn new(
        probe: P,
        info: ConnectionInfo,
        interval: Duration,
        sink: Arc<dyn ReportSink>,
        cancel: tokio_util::sync::CancellationToken,
    ) -> Self {
        Self {
            probe,
            info,
            interval: interval.max(MIN_INTERVAL),
            sink,
            cancel,
        }
    }

    /// Run until cancelled or until sampling fails; returns the number of
    /// samples emitted
    pub async fn run(self) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        let mut sequence = 0;
        loop {
            if !self.report(sequence) {
                break;
            }
            sequence += 1;

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
        }

        tracing::debug!(
            connection = self.info.connection,
            samples = sequence,
            "reporter stopped"
        );
        sequence
    }

    /// Take and emit one sample, false when the reporter has to stop
    fn report(&self, sequence: u64) -> bool {
        let snapshot = match self.probe.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    connection = self.info.connection,
                    error = %e,
                    "stop sampling: cannot read socket state"
                );
                return false;
            }
        };

        if let Some(tcp_info) = &snapshot.tcp_info {
            tracing::trace!(
                connection = self.info.connection,
                state = tcp_info.state_name(),
                rtt_us = tcp_info.rtt,
                total_retrans = tcp_info.total_retrans,
                "sampled"
            );
        }

        let sample = Sample {
            info: self.info.clone(),
            sequence,
            taken_at: chrono::Utc::now(),
            snapshot,
        };

        if let Err(e) = self.sink.emit(&sample) {
            tracing::warn!(
                connection = self.info.connection,
                error = %e,
                "stop sampling: cannot emit sample"
            );
            return false;
        }
        true
    }
}
