//! Error types for tcpinfo-sock

/// Errors that fail a whole snapshot
///
/// Individual field queries never produce these; a failed query just leaves
/// its field absent.
#[derive(Debug, thiserror::Error)]
pub enum IntrospectError {
    #[error("socket has no usable descriptor: {reason}")]
    NoDescriptor { reason: String },

    #[error("failed to duplicate socket descriptor: {source}")]
    Duplicate {
        #[source]
        source: std::io::Error,
    },

    #[error("socket introspection is not supported on {platform}")]
    Unsupported {
        platform: &'static str,
        /// Snapshot with every field absent
        partial: crate::SocketSnapshot,
    },
}

impl IntrospectError {
    pub(crate) fn no_descriptor(reason: impl Into<String>) -> Self {
        Self::NoDescriptor {
            reason: reason.into(),
        }
    }
}
