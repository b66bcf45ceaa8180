//! tcpinfo-relay: relay TCP connections and report the destination socket's
//! kernel state as JSON on stdout
//!
//! Logs go to stderr, filtered with `RUST_LOG` (default `info`).

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use tcpinfo_relay::config::{self, OutputFormat};

#[derive(Parser)]
#[command(name = "tcpinfo-relay")]
#[command(about = "Relay TCP connections to a destination and report its socket state")]
#[command(version)]
struct Cli {
    /// Destination every connection is relayed to (host:port)
    #[arg(env = "TCPINFO_DESTINATION")]
    destination: String,

    /// Port to listen on
    #[arg(long, env = "TCPINFO_PORT", default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Address to listen on
    #[arg(long, env = "TCPINFO_HOST", default_value = "127.0.0.1")]
    host: std::net::IpAddr,

    /// Interval between two reports of the same connection (e.g. 500ms, 1s, 2m)
    #[arg(long, env = "TCPINFO_REPORT_INTERVAL", default_value = "1s", value_parser = config::parse_duration)]
    report_interval: Duration,

    /// Give up dialing the destination after this long (defaults to the OS limit)
    #[arg(long, env = "TCPINFO_CONNECT_TIMEOUT", value_parser = config::parse_duration)]
    connect_timeout: Option<Duration>,

    /// How long the client may keep sending after the destination has finished
    #[arg(long, env = "TCPINFO_DRAIN_TIMEOUT", default_value = "1s", value_parser = config::parse_duration)]
    drain_timeout: Duration,

    /// Output format of the reports
    #[arg(long, env = "TCPINFO_FORMAT", value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,
}

impl Cli {
    fn into_config(self) -> tcpinfo_relay::Config {
        let listen = std::net::SocketAddr::new(self.host, self.port);
        let config = tcpinfo_relay::Config::new(listen, self.destination)
            .with_report_interval(self.report_interval)
            .with_drain_timeout(self.drain_timeout)
            .with_format(self.format);
        match self.connect_timeout {
            Some(timeout) => config.with_connect_timeout(timeout),
            None => config,
        }
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_logging();

    let config = Cli::parse().into_config();
    let listen = config.listen;
    let sink = Arc::new(
        tcpinfo_relay::StdoutSink::spawn(config.format).wrap_err("cannot start output writer")?,
    );

    let dispatcher = tcpinfo_relay::Dispatcher::bind(config, sink)
        .await
        .wrap_err_with(|| format!("cannot start relay on {listen}"))?;

    dispatcher.serve().await.wrap_err("relay stopped")
}
