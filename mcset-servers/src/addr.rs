use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

use crate::ServerSetError;

/// Resolves a `host:port` endpoint into a socket address.
///
/// Literal socket addresses are parsed directly, anything else goes through
/// the system resolver with IPv4 results preferred. The system resolver blocks
/// the calling thread.
pub fn resolve_endpoint(endpoint: &str) -> Result<SocketAddr, ServerSetError> {
    if let Ok(addr) = endpoint.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let resolved = endpoint
        .to_socket_addrs()
        .map_err(|source| ServerSetError::AddressResolution {
            endpoint: endpoint.to_string(),
            source,
        })?
        .collect::<Vec<_>>();

    resolved
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| resolved.first())
        .copied()
        .ok_or_else(|| ServerSetError::AddressResolution {
            endpoint: endpoint.to_string(),
            source: io::Error::new(
                io::ErrorKind::NotFound,
                "endpoint did not resolve to any address",
            ),
        })
}
