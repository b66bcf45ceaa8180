//! # tcpinfo-relay
//!
//! A transparent TCP relay that reports what the kernel knows about the
//! destination leg of every connection while bytes flow through it.
//!
//! Each accepted client connection gets its own connection to a fixed
//! destination. Bytes are copied in both directions untouched. Meanwhile a
//! reporter samples the destination socket (queue depths, buffer sizes,
//! timeouts, linger and `tcp_info`) once when the connection is set up and
//! then on every report interval, until either side of the connection
//! finishes.
//!
//! ## Usage
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//!
//! let config = tcpinfo_relay::Config::new("127.0.0.1:9999".parse().unwrap(), "example.com:80")
//!     .with_report_interval(std::time::Duration::from_millis(500));
//! let sink = Arc::new(tcpinfo_relay::StdoutSink::spawn(config.format)?);
//!
//! tcpinfo_relay::Dispatcher::bind(config, sink).await?.serve().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Records are JSON objects: the connection id, the per-connection sequence
//! number, the client and destination addresses, a timestamp and every
//! snapshot field (`null` where the kernel could not be asked).

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod relay;
pub mod reporter;
pub mod sink;

pub use config::{Config, OutputFormat};
pub use dispatcher::{Acceptor, Dispatcher, is_transient_accept_error};
pub use error::{ConfigError, RelayError, SinkError};
pub use relay::{Relay, RelayStats};
pub use reporter::{ConnectionInfo, Reporter, Sample};
pub use sink::{ChannelSink, ReportSink, StdoutSink, WriterSink};
