use std::io;

use mcset_ring::RingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerSetError {
    #[error("No servers are available.")]
    /// The server set is empty, or a failover pass over every server
    /// completed without any success.
    ///
    /// Callers iterating with [ServerSet::each](crate::ServerSet::each) may
    /// return this from their callback to signal exhaustion.
    NoServers,

    #[error("Failed to resolve endpoint {endpoint:?}: {source}")]
    /// The endpoint identifier could not be parsed or resolved into a socket address.
    AddressResolution {
        endpoint: String,
        #[source]
        source: io::Error,
    },
}

impl From<RingError> for ServerSetError {
    fn from(error: RingError) -> Self {
        match error {
            RingError::NoMembers => Self::NoServers,
        }
    }
}
