//! Error types for tcpinfo-relay

/// Errors that stop the relay as a whole
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("fatal accept error: {source}")]
    Accept {
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },
}

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: String },

    #[error("report interval must be greater than zero")]
    ZeroInterval,

    #[error("destination address is required")]
    MissingDestination,
}

/// Errors writing a sample to a report sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to serialize sample: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("failed to write sample: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("report sink is closed")]
    Closed,
}
