use std::os::fd::RawFd;

use super::unix::{field, getsockopt, getsockopt_int, ioctl_int, linger, timeout};
use crate::{IntrospectError, SocketSnapshot, TcpInfo};

pub(crate) fn snapshot(fd: RawFd) -> Result<SocketSnapshot, IntrospectError> {
    Ok(SocketSnapshot {
        // FIONREAD is the same request as TIOCINQ
        recv_queue: field("recv_queue", ioctl_int!(fd, libc::FIONREAD)),
        send_queue: field("send_queue", ioctl_int!(fd, libc::TIOCOUTQ)),
        recv_buffer: field(
            "recv_buffer",
            getsockopt_int(fd, libc::SOL_SOCKET, libc::SO_RCVBUF),
        ),
        send_buffer: field(
            "send_buffer",
            getsockopt_int(fd, libc::SOL_SOCKET, libc::SO_SNDBUF),
        ),
        recv_timeout: field("recv_timeout", timeout(fd, libc::SO_RCVTIMEO)),
        send_timeout: field("send_timeout", timeout(fd, libc::SO_SNDTIMEO)),
        linger: field("linger", linger(fd)),
        tcp_info: field("tcp_info", tcp_info(fd)),
    })
}

fn tcp_info(fd: RawFd) -> std::io::Result<TcpInfo> {
    // SAFETY: TcpInfo is repr(C) with the kernel's struct tcp_info layout and
    // the kernel copies min(len, sizeof(tcp_info)) bytes
    unsafe { getsockopt(fd, libc::IPPROTO_TCP, libc::TCP_INFO) }
}
