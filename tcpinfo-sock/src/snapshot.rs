//! Snapshot types
//!
//! All types serialize with serde. Absent fields serialize as `null` so every
//! record carries the same set of keys.

/// Kernel-tracked state of one socket at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SocketSnapshot {
    /// Bytes queued for the application to read
    pub recv_queue: Option<u32>,
    /// Bytes written but not yet acknowledged by the peer
    pub send_queue: Option<u32>,
    /// `SO_RCVBUF`
    pub recv_buffer: Option<u32>,
    /// `SO_SNDBUF`
    pub send_buffer: Option<u32>,
    /// `SO_RCVTIMEO`, a zero timeval means no timeout is configured
    pub recv_timeout: Option<Timeval>,
    /// `SO_SNDTIMEO`, a zero timeval means no timeout is configured
    pub send_timeout: Option<Timeval>,
    /// `SO_LINGER`
    pub linger: Option<Linger>,
    /// Extended TCP statistics
    pub tcp_info: Option<TcpInfo>,
}

impl SocketSnapshot {
    /// True when no field could be read at all
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A socket timeout exactly as the kernel reports it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Timeval {
    pub sec: i64,
    pub usec: i64,
}

impl Timeval {
    pub fn is_zero(&self) -> bool {
        self.sec == 0 && self.usec == 0
    }

    /// The configured timeout, `None` when the kernel has no timeout set
    pub fn as_duration(&self) -> Option<std::time::Duration> {
        if self.is_zero() || self.sec < 0 || self.usec < 0 {
            return None;
        }
        Some(std::time::Duration::from_secs(self.sec as u64) + std::time::Duration::from_micros(self.usec as u64))
    }
}

/// `SO_LINGER` as the kernel reports it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Linger {
    /// Non-zero when lingering on close is enabled
    pub onoff: i32,
    /// Linger time in seconds
    pub linger: i32,
}

impl Linger {
    pub fn enabled(&self) -> bool {
        self.onoff != 0
    }
}

/// Extended TCP statistics
///
/// The layout is Linux's `struct tcp_info` (`include/uapi/linux/tcp.h`) so the
/// kernel can fill it directly. Kernels that know a shorter version of the
/// struct leave the trailing fields at zero. Times are in microseconds unless
/// the field name says otherwise (`last_*` are milliseconds).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TcpInfo {
    pub state: u8,
    pub ca_state: u8,
    pub retransmits: u8,
    pub probes: u8,
    pub backoff: u8,
    pub options: u8,
    /// `tcpi_snd_wscale:4, tcpi_rcv_wscale:4`
    pub wscale: u8,
    /// `tcpi_delivery_rate_app_limited:1, tcpi_fastopen_client_fail:2`
    pub delivery_flags: u8,

    pub rto: u32,
    pub ato: u32,
    pub snd_mss: u32,
    pub rcv_mss: u32,

    pub unacked: u32,
    pub sacked: u32,
    pub lost: u32,
    pub retrans: u32,
    pub fackets: u32,

    pub last_data_sent: u32,
    pub last_ack_sent: u32,
    pub last_data_recv: u32,
    pub last_ack_recv: u32,

    pub pmtu: u32,
    pub rcv_ssthresh: u32,
    pub rtt: u32,
    pub rttvar: u32,
    pub snd_ssthresh: u32,
    pub snd_cwnd: u32,
    pub advmss: u32,
    pub reordering: u32,

    pub rcv_rtt: u32,
    pub rcv_space: u32,

    pub total_retrans: u32,

    pub pacing_rate: u64,
    pub max_pacing_rate: u64,
    pub bytes_acked: u64,
    pub bytes_received: u64,
    pub segs_out: u32,
    pub segs_in: u32,

    pub notsent_bytes: u32,
    pub min_rtt: u32,
    pub data_segs_in: u32,
    pub data_segs_out: u32,

    pub delivery_rate: u64,

    pub busy_time: u64,
    pub rwnd_limited: u64,
    pub sndbuf_limited: u64,

    pub delivered: u32,
    pub delivered_ce: u32,

    pub bytes_sent: u64,
    pub bytes_retrans: u64,
    pub dsack_dups: u32,
    pub reord_seen: u32,

    pub rcv_ooopack: u32,

    pub snd_wnd: u32,
    pub rcv_wnd: u32,

    pub rehash: u32,
}

impl TcpInfo {
    pub fn snd_wscale(&self) -> u8 {
        self.wscale & 0x0f
    }

    pub fn rcv_wscale(&self) -> u8 {
        self.wscale >> 4
    }

    pub fn delivery_rate_app_limited(&self) -> bool {
        self.delivery_flags & 0x01 != 0
    }

    /// Connection state name, using Linux state numbering
    pub fn state_name(&self) -> &'static str {
        match self.state {
            1 => "ESTABLISHED",
            2 => "SYN_SENT",
            3 => "SYN_RECV",
            4 => "FIN_WAIT1",
            5 => "FIN_WAIT2",
            6 => "TIME_WAIT",
            7 => "CLOSE",
            8 => "CLOSE_WAIT",
            9 => "LAST_ACK",
            10 => "LISTEN",
            11 => "CLOSING",
            12 => "NEW_SYN_RECV",
            _ => "UNKNOWN",
        }
    }
}
