use std::os::fd::RawFd;

use super::unix::{field, getsockopt, getsockopt_int, ioctl_int, linger, timeout};
use crate::{IntrospectError, SocketSnapshot, TcpInfo};

// netinet/tcp.h
const TCP_CONNECTION_INFO: libc::c_int = 0x106;

/// `struct tcp_connection_info`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
struct TcpConnectionInfo {
    state: u8,
    snd_wscale: u8,
    rcv_wscale: u8,
    _pad: u8,
    options: u32,
    flags: u32,
    rto: u32,
    maxseg: u32,
    snd_ssthresh: u32,
    snd_cwnd: u32,
    snd_wnd: u32,
    snd_sbbytes: u32,
    rcv_wnd: u32,
    rttcur: u32,
    srtt: u32,
    rttvar: u32,
    /// tcpi_tfo_* bitfields
    tfo: u32,
    txpackets: u64,
    txbytes: u64,
    txretransmitbytes: u64,
    rxpackets: u64,
    rxbytes: u64,
    rxoutoforderbytes: u64,
    txretransmitpackets: u64,
}

pub(crate) fn snapshot(fd: RawFd) -> Result<SocketSnapshot, IntrospectError> {
    Ok(SocketSnapshot {
        recv_queue: field("recv_queue", ioctl_int!(fd, libc::FIONREAD)),
        send_queue: field(
            "send_queue",
            getsockopt_int(fd, libc::SOL_SOCKET, libc::SO_NWRITE),
        ),
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
        tcp_info: field("tcp_info", connection_info(fd).map(TcpInfo::from)),
    })
}

fn connection_info(fd: RawFd) -> std::io::Result<TcpConnectionInfo> {
    // SAFETY: TcpConnectionInfo is repr(C) with the layout of
    // struct tcp_connection_info
    unsafe { getsockopt(fd, libc::IPPROTO_TCP, TCP_CONNECTION_INFO) }
}

/// Darwin TCPS_* numbering to Linux TCP_* numbering
fn linux_state(state: u8) -> u8 {
    match state {
        0 => 7,
        1 => 10,
        2 => 2,
        3 => 3,
        4 => 1,
        5 => 8,
        6 => 4,
        7 => 11,
        8 => 9,
        9 => 5,
        10 => 6,
        _ => 0,
    }
}

impl From<TcpConnectionInfo> for TcpInfo {
    fn from(info: TcpConnectionInfo) -> Self {
        // Darwin reports rto and rtt in milliseconds
        TcpInfo {
            state: linux_state(info.state),
            options: info.options as u8,
            wscale: (info.snd_wscale & 0x0f) | (info.rcv_wscale << 4),
            rto: info.rto.saturating_mul(1000),
            snd_mss: info.maxseg,
            rtt: info.srtt.saturating_mul(1000),
            rttvar: info.rttvar.saturating_mul(1000),
            snd_ssthresh: info.snd_ssthresh,
            snd_cwnd: info.snd_cwnd,
            total_retrans: info.txretransmitpackets as u32,
            bytes_sent: info.txbytes,
            bytes_received: info.rxbytes,
            bytes_retrans: info.txretransmitbytes,
            segs_out: info.txpackets as u32,
            segs_in: info.rxpackets as u32,
            snd_wnd: info.snd_wnd,
            rcv_wnd: info.rcv_wnd,
            ..Default::default()
        }
    }
}
