//! # tcpinfo-sock
//!
//! Point-in-time snapshots of the state the kernel keeps for a TCP socket.
//!
//! A [`SocketSnapshot`] collects, for one connected socket:
//!
//! - receive and send queue depths (bytes waiting to be read / not yet acked)
//! - configured receive and send buffer sizes
//! - receive and send timeouts
//! - the linger setting
//! - the extended TCP statistics block (`tcp_info` on Linux,
//!   `TCP_CONNECTION_INFO` on macOS): retransmits, RTT, congestion window,
//!   connection state and byte/segment counters
//!
//! Every field is queried independently and is individually optional: a
//! failed query leaves that field `None` and never fails the snapshot. The
//! only thing that fails a snapshot is not being able to get at the socket's
//! descriptor in the first place.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tcpinfo_sock::SocketIntrospectable;
//!
//! let stream = std::net::TcpStream::connect("127.0.0.1:8080")?;
//! let snapshot = stream.snapshot()?;
//! println!("{}", serde_json::to_string_pretty(&snapshot)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! When another task owns the stream exclusively (e.g. it is split into
//! halves for copying), take a [`SocketProbe`] first. The probe holds a
//! duplicate of the descriptor and can be sampled from anywhere:
//!
//! ```rust,no_run
//! # async fn example(stream: tokio::net::TcpStream) -> Result<(), tcpinfo_sock::IntrospectError> {
//! use tcpinfo_sock::{SocketIntrospectable, SocketProbe};
//!
//! let probe = SocketProbe::duplicate(&stream)?;
//! let (_read, _write) = stream.into_split();
//! let snapshot = probe.snapshot()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Platforms
//!
//! - Linux: `ioctl(TIOCINQ/TIOCOUTQ)`, `getsockopt(SOL_SOCKET, ...)` and
//!   `getsockopt(IPPROTO_TCP, TCP_INFO)`
//! - macOS: `ioctl(FIONREAD)`, `getsockopt(SO_NWRITE)` and
//!   `getsockopt(IPPROTO_TCP, TCP_CONNECTION_INFO)`, mapped onto the same
//!   [`TcpInfo`] fields
//! - anything else: [`IntrospectError::Unsupported`] carrying an all-absent
//!   snapshot

mod error;
mod introspect;
mod snapshot;
mod sys;

pub use error::IntrospectError;
pub use introspect::{RawDescriptor, SocketIntrospectable, SocketProbe};
pub use snapshot::{Linger, SocketSnapshot, TcpInfo, Timeval};
