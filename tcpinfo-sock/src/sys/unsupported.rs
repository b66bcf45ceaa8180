use crate::{IntrospectError, RawDescriptor, SocketSnapshot};

pub(crate) fn snapshot(_descriptor: RawDescriptor) -> Result<SocketSnapshot, IntrospectError> {
    Err(IntrospectError::Unsupported {
        platform: std::env::consts::OS,
        partial: SocketSnapshot::default(),
    })
}
