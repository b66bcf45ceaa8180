//! The introspection capability and the types that provide it

use crate::{IntrospectError, SocketSnapshot};

#[cfg(unix)]
pub type RawDescriptor = std::os::fd::RawFd;

#[cfg(windows)]
pub type RawDescriptor = std::os::windows::io::RawSocket;

/// Anything that can expose the descriptor of a connected TCP socket
///
/// [`descriptor`](Self::descriptor) is the precondition step: when it fails the
/// whole snapshot fails. Once a descriptor is available every query is
/// best-effort.
pub trait SocketIntrospectable {
    /// Raw descriptor of the underlying socket
    fn descriptor(&self) -> Result<RawDescriptor, IntrospectError>;

    /// Take a fresh snapshot of the socket's kernel state
    fn snapshot(&self) -> Result<SocketSnapshot, IntrospectError> {
        let descriptor = self.descriptor()?;
        crate::sys::snapshot(descriptor)
    }
}

impl SocketIntrospectable for std::net::TcpStream {
    fn descriptor(&self) -> Result<RawDescriptor, IntrospectError> {
        Ok(raw_descriptor(self))
    }
}

impl SocketIntrospectable for tokio::net::TcpStream {
    fn descriptor(&self) -> Result<RawDescriptor, IntrospectError> {
        Ok(raw_descriptor(self))
    }
}

impl<T: SocketIntrospectable + ?Sized> SocketIntrospectable for &T {
    fn descriptor(&self) -> Result<RawDescriptor, IntrospectError> {
        (**self).descriptor()
    }

    fn snapshot(&self) -> Result<SocketSnapshot, IntrospectError> {
        (**self).snapshot()
    }
}

/// `None` stands for a connection that was never established
impl<T: SocketIntrospectable> SocketIntrospectable for Option<T> {
    fn descriptor(&self) -> Result<RawDescriptor, IntrospectError> {
        match self {
            Some(socket) => socket.descriptor(),
            None => Err(IntrospectError::no_descriptor("connection is not established")),
        }
    }

    fn snapshot(&self) -> Result<SocketSnapshot, IntrospectError> {
        match self {
            Some(socket) => socket.snapshot(),
            None => Err(IntrospectError::no_descriptor("connection is not established")),
        }
    }
}

/// Read-only handle on a socket owned by someone else
///
/// Holds a duplicate of the socket's descriptor, so it stays valid for as long
/// as the probe lives even if the original stream is split, moved into another
/// task or dropped. Dropping the probe closes only the duplicate.
#[derive(Debug)]
pub struct SocketProbe {
    #[cfg(unix)]
    fd: std::os::fd::OwnedFd,
    #[cfg(windows)]
    socket: std::os::windows::io::OwnedSocket,
}

impl SocketProbe {
    /// Duplicate the descriptor of `socket`
    #[cfg(unix)]
    pub fn duplicate<S: std::os::fd::AsFd>(socket: &S) -> Result<Self, IntrospectError> {
        let fd = socket
            .as_fd()
            .try_clone_to_owned()
            .map_err(|source| IntrospectError::Duplicate { source })?;
        Ok(Self { fd })
    }

    /// Duplicate the descriptor of `socket`
    #[cfg(windows)]
    pub fn duplicate<S: std::os::windows::io::AsSocket>(socket: &S) -> Result<Self, IntrospectError> {
        let socket = socket
            .as_socket()
            .try_clone_to_owned()
            .map_err(|source| IntrospectError::Duplicate { source })?;
        Ok(Self { socket })
    }
}

impl SocketIntrospectable for SocketProbe {
    #[cfg(unix)]
    fn descriptor(&self) -> Result<RawDescriptor, IntrospectError> {
        Ok(std::os::fd::AsRawFd::as_raw_fd(&self.fd))
    }

    #[cfg(windows)]
    fn descriptor(&self) -> Result<RawDescriptor, IntrospectError> {
        Ok(std::os::windows::io::AsRawSocket::as_raw_socket(&self.socket))
    }
}

#[cfg(unix)]
fn raw_descriptor<S: std::os::fd::AsRawFd>(socket: &S) -> RawDescriptor {
    socket.as_raw_fd()
}

#[cfg(windows)]
fn raw_descriptor<S: std::os::windows::io::AsRawSocket>(socket: &S) -> RawDescriptor {
    socket.as_raw_socket()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_pair() -> (std::net::TcpStream, std::net::TcpStream) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let client = std::net::TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn test_missing_connection_has_no_descriptor() {
        let missing: Option<std::net::TcpStream> = None;

        let err = missing.snapshot().unwrap_err();
        assert!(matches!(err, IntrospectError::NoDescriptor { .. }));
        assert!(err.to_string().contains("not established"));
    }

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn test_snapshot_reads_buffer_sizes() {
        let (client, _server) = connected_pair();

        let snapshot = client.snapshot().unwrap();
        assert!(snapshot.recv_buffer.unwrap() > 0);
        assert!(snapshot.send_buffer.unwrap() > 0);
        assert_eq!(snapshot.recv_queue, Some(0));
        assert_eq!(snapshot.linger.map(|l| l.enabled()), Some(false));
    }

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn test_snapshot_reports_configured_timeouts() {
        let (client, _server) = connected_pair();
        client
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .unwrap();

        let snapshot = client.snapshot().unwrap();
        assert_eq!(
            snapshot.recv_timeout.and_then(|t| t.as_duration()),
            Some(std::time::Duration::from_secs(2))
        );
        // unset is reported as a zero timeval, not as absent
        assert_eq!(snapshot.send_timeout, Some(crate::Timeval::default()));
    }

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn test_snapshot_sees_unread_bytes() {
        use std::io::Write;

        let (mut client, server) = connected_pair();
        client.write_all(&[7u8; 100]).unwrap();
        client.flush().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(100));

        let snapshot = server.snapshot().unwrap();
        assert_eq!(snapshot.recv_queue, Some(100));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_snapshot_reads_tcp_info() {
        let (client, _server) = connected_pair();

        let info = client.snapshot().unwrap().tcp_info.unwrap();
        assert_eq!(info.state_name(), "ESTABLISHED");
        assert!(info.snd_mss > 0);
    }

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn test_option_fields_are_stable_between_snapshots() {
        let (client, _server) = connected_pair();

        let first = client.snapshot().unwrap();
        let second = client.snapshot().unwrap();

        assert_eq!(first.recv_buffer, second.recv_buffer);
        assert_eq!(first.send_buffer, second.send_buffer);
        assert_eq!(first.recv_timeout, second.recv_timeout);
        assert_eq!(first.send_timeout, second.send_timeout);
        assert_eq!(first.linger, second.linger);
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_outlives_original_stream() {
        let (client, _server) = connected_pair();
        let probe = SocketProbe::duplicate(&client).unwrap();
        assert_ne!(probe.descriptor().unwrap(), client.descriptor().unwrap());

        drop(client);

        // the duplicate still refers to the same (still open) socket
        assert!(probe.descriptor().is_ok());
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        assert!(probe.snapshot().unwrap().recv_buffer.is_some());
    }

    #[tokio::test]
    async fn test_tokio_stream_is_introspectable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = tokio::net::TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let _server = listener.accept().await.unwrap();

        let result = client.snapshot();
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        assert!(result.unwrap().send_buffer.is_some());
        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        assert!(matches!(result, Err(IntrospectError::Unsupported { .. })));
    }
}
