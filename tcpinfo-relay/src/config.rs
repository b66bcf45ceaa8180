//! Relay configuration
//!
//! Built once at startup (from the command line in the binary) and shared
//! read-only by every connection.

use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 9999;
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// How samples are rendered on the output sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Indented JSON, one record spanning several lines
    #[default]
    Pretty,
    /// One JSON object per line
    Compact,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the relay listens on
    pub listen: std::net::SocketAddr,
    /// Fixed upstream every connection is relayed to (`host:port`)
    pub destination: String,
    /// Time between two samples of the same connection
    pub report_interval: Duration,
    /// Upper bound on dialing the destination, `None` leaves it to the OS
    pub connect_timeout: Option<Duration>,
    /// How long the client→destination direction may keep running after the
    /// destination→client direction has finished
    pub drain_timeout: Duration,
    pub format: OutputFormat,
}

impl Config {
    pub fn new(listen: std::net::SocketAddr, destination: impl Into<String>) -> Self {
        Self {
            listen,
            destination: destination.into(),
            report_interval: DEFAULT_REPORT_INTERVAL,
            connect_timeout: None,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            format: OutputFormat::default(),
        }
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.destination.trim().is_empty() {
            return Err(ConfigError::MissingDestination);
        }
        if self.report_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}

/// Parse a duration such as `300ms`, `1s`, `1.5s`, `2m` or `1h30m`
///
/// Accepts the units `ns`, `us`, `µs`, `ms`, `s`, `m` and `h`. A bare `0` is
/// allowed; any other number needs a unit.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDuration {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let s = input.trim();
    if s.is_empty() {
        return Err(invalid("empty duration"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos: f64 = 0.0;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid("expected a number"));
        }
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| invalid("malformed number"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_nanos = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid("unknown unit")),
        };
        rest = &rest[unit_len..];

        total_nanos += value * unit_nanos;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(invalid("duration out of range"));
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}
