//! Session description: who we are and how peers reach each other.

use crate::error::SessionError;
use crate::family::NetworkFamily;

use netstart_transport::RelayData;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Part this process plays in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Server,
    Client,
    /// Server and client in the same process.
    Host,
}

impl Role {
    pub fn runs_server(self) -> bool {
        matches!(self, Role::Server | Role::Host)
    }

    pub fn runs_client(self) -> bool {
        matches!(self, Role::Client | Role::Host)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Server => write!(f, "Server"),
            Role::Client => write!(f, "Client"),
            Role::Host => write!(f, "Host"),
        }
    }
}

impl FromStr for Role {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(Role::Server),
            "client" => Ok(Role::Client),
            "host" => Ok(Role::Host),
            other => Err(SessionError::InvalidConfiguration {
                reason: format!("unknown role {other:?}"),
            }),
        }
    }
}

/// How peers find each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    /// Known host/port addressing.
    Direct,
    /// Connectivity brokered by a relay service.
    Relay,
    /// Authority spread across peers. Never supported.
    DistributedAuthority,
    /// Any tag this build does not know.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Direct => write!(f, "Direct"),
            Topology::Relay => write!(f, "Relay"),
            Topology::DistributedAuthority => write!(f, "DistributedAuthority"),
            Topology::Unknown => write!(f, "Unknown"),
        }
    }
}

impl FromStr for Topology {
    type Err = SessionError;

    /// Unrecognized tags parse to [`Topology::Unknown`], which `validate`
    /// rejects.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Topology::Direct,
            "relay" => Topology::Relay,
            "distributedauthority" | "distributed-authority" => Topology::DistributedAuthority,
            _ => Topology::Unknown,
        })
    }
}

/// Where a server (or host) listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenEndpoint {
    /// Address without port.
    pub address: String,
    pub port: u16,
    pub family: NetworkFamily,
}

impl ListenEndpoint {
    pub fn new(address: impl Into<String>, port: u16, family: NetworkFamily) -> Self {
        Self {
            address: address.into(),
            port,
            family,
        }
    }
}

impl From<SocketAddr> for ListenEndpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port(), addr.ip().into())
    }
}

impl fmt::Display for ListenEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.address, self.port, self.family)
    }
}

/// Address clients are told to connect to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishEndpoint {
    pub address: String,
    pub port: u16,
}

impl PublishEndpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl From<SocketAddr> for PublishEndpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl fmt::Display for PublishEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Direct-network defaults: both addresses on loopback, port 7770.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectNetworkOptions {
    pub listen_ip: String,
    pub publish_ip: String,
    pub port: u16,
}

impl Default for DirectNetworkOptions {
    fn default() -> Self {
        Self {
            listen_ip: "127.0.0.1".to_string(),
            publish_ip: "127.0.0.1".to_string(),
            port: 7770,
        }
    }
}

/// A complete session description, handed to `start` by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfiguration {
    pub role: Role,
    pub topology: Topology,
    #[serde(default)]
    pub direct_listen: Option<ListenEndpoint>,
    #[serde(default)]
    pub direct_publish: Option<PublishEndpoint>,
    #[serde(default)]
    pub relay_server_data: Option<RelayData>,
    #[serde(default)]
    pub relay_client_data: Option<RelayData>,
}

impl SessionConfiguration {
    /// Bare description with no addressing or relay data.
    pub fn new(role: Role, topology: Topology) -> Self {
        Self {
            role,
            topology,
            direct_listen: None,
            direct_publish: None,
            relay_server_data: None,
            relay_client_data: None,
        }
    }

    /// Direct topology with both endpoints filled from `options`.
    ///
    /// The listen family is derived from `listen_ip`; a non-IP literal
    /// yields [`NetworkFamily::Invalid`] and fails at start.
    pub fn direct(role: Role, options: &DirectNetworkOptions) -> Self {
        let family = NetworkFamily::of_address(&options.listen_ip);
        Self::new(role, Topology::Direct)
            .with_listen(ListenEndpoint::new(
                options.listen_ip.clone(),
                options.port,
                family,
            ))
            .with_publish(PublishEndpoint::new(options.publish_ip.clone(), options.port))
    }

    /// Relay topology with both allocation payloads.
    pub fn relay(role: Role, server_data: RelayData, client_data: RelayData) -> Self {
        Self {
            relay_server_data: Some(server_data),
            relay_client_data: Some(client_data),
            ..Self::new(role, Topology::Relay)
        }
    }

    pub fn with_listen(mut self, endpoint: ListenEndpoint) -> Self {
        self.direct_listen = Some(endpoint);
        self
    }

    pub fn with_publish(mut self, endpoint: PublishEndpoint) -> Self {
        self.direct_publish = Some(endpoint);
        self
    }

    /// Check the role/topology pair and the fields it requires.
    ///
    /// Pure: never touches a transport.
    pub fn validate(&self) -> Result<(), SessionError> {
        let (role, topology) = (self.role, self.topology);
        match topology {
            Topology::DistributedAuthority => Err(SessionError::UnsupportedMode { topology }),
            Topology::Unknown => Err(SessionError::InvalidConfiguration {
                reason: "unknown topology".to_string(),
            }),
            Topology::Direct => {
                if role.runs_server() && self.direct_listen.is_none() {
                    return Err(SessionError::missing("direct_listen", role, topology));
                }
                if role == Role::Client && self.direct_publish.is_none() {
                    return Err(SessionError::missing("direct_publish", role, topology));
                }
                Ok(())
            }
            Topology::Relay => {
                if self.relay_server_data.is_none() {
                    return Err(SessionError::missing("relay_server_data", role, topology));
                }
                if self.relay_client_data.is_none() {
                    return Err(SessionError::missing("relay_client_data", role, topology));
                }
                Ok(())
            }
        }
    }
}
