//! netstart transport layer.
//!
//! The session adapter never talks to sockets. It drives a peer transport
//! through the narrow capability surface defined here:
//!
//! - [`Transport`]: direct addressing setters plus optional capability
//!   queries ([`Transport::relay`], [`Transport::aggregator`]).
//! - [`ServerManager`] / [`ClientManager`]: start, stop and "is started"
//!   queries on the non-aggregated path.
//! - [`TransportCapabilities`]: the bundle injected into the adapter.
//!
//! [`MemoryTransport`] implements every capability in memory and records
//! each call, so adapters can be exercised without a network.
//!
//! ```rust
//! use netstart_transport::{MemoryTransport, TransportCapabilities, TransportKind};
//!
//! let transport = MemoryTransport::builder()
//!     .sub_transports([TransportKind::Udp, TransportKind::Relay])
//!     .build();
//! let caps = TransportCapabilities::from_shared(transport.clone());
//! assert!(caps.transport.aggregator().is_some());
//! ```

mod capability;
mod error;
mod memory;

pub use capability::{
    ClientManager, RelayTransport, ServerManager, Transport, TransportAggregator,
    TransportCapabilities,
};
pub use error::TransportError;
pub use memory::{MemoryTransport, MemoryTransportBuilder, TransportCall};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// IP version the transport binds its server socket with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpVersion {
    Ipv4,
    Ipv6,
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::Ipv4 => write!(f, "IPv4"),
            IpVersion::Ipv6 => write!(f, "IPv6"),
        }
    }
}

/// Kind of a sub-transport inside an aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    /// Plain UDP with direct addressing.
    Udp,
    /// Relay-brokered transport (accepts relay payloads).
    Relay,
    /// WebSocket transport for browser peers.
    WebSocket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Udp => write!(f, "udp"),
            TransportKind::Relay => write!(f, "relay"),
            TransportKind::WebSocket => write!(f, "websocket"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" => Ok(TransportKind::Udp),
            "relay" => Ok(TransportKind::Relay),
            "websocket" | "ws" => Ok(TransportKind::WebSocket),
            other => Err(TransportError::UnknownKind(other.to_string())),
        }
    }
}

/// Opaque relay allocation payload.
///
/// Produced by the relay service and handed to the transport untouched.
/// Only `endpoint` is ever read, and only for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayData {
    /// Relay endpoint, `host:port`.
    pub endpoint: String,
    /// Allocation blob (connection data, keys, HMAC...).
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl RelayData {
    pub fn new(endpoint: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            endpoint: endpoint.into(),
            payload: payload.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_version_display() {
        assert_eq!(IpVersion::Ipv4.to_string(), "IPv4");
        assert_eq!(IpVersion::Ipv6.to_string(), "IPv6");
    }

    #[test]
    fn transport_kind_parses_case_insensitive() {
        assert_eq!("UDP".parse::<TransportKind>().unwrap(), TransportKind::Udp);
        assert_eq!(" relay ".parse::<TransportKind>().unwrap(), TransportKind::Relay);
        assert_eq!("ws".parse::<TransportKind>().unwrap(), TransportKind::WebSocket);
    }

    #[test]
    fn transport_kind_rejects_unknown() {
        let err = "carrier-pigeon".parse::<TransportKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown transport kind: carrier-pigeon");
    }

    #[test]
    fn relay_data_payload_defaults_to_empty() {
        let data: RelayData = serde_json::from_str(r#"{"endpoint":"10.0.0.1:443"}"#).unwrap();
        assert_eq!(data, RelayData::new("10.0.0.1:443", Vec::new()));
    }
}
