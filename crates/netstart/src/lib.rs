//! netstart session layer.
//!
//! Turns an abstract session description (role + topology + addressing or
//! relay data) into configuration and start/stop calls on a peer transport.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use netstart::{DirectNetworkOptions, HandlerConfig, Role, SessionConfiguration, SessionHandler};
//! use netstart_transport::{MemoryTransport, TransportCapabilities};
//!
//! # async fn example() -> Result<(), netstart::SessionError> {
//! let caps = TransportCapabilities::from_shared(MemoryTransport::new());
//! let handler = SessionHandler::new(caps, HandlerConfig::new());
//!
//! let session = SessionConfiguration::direct(Role::Host, &DirectNetworkOptions::default());
//! handler.start(&session).await?;
//! handler.stop().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod configurator;
mod error;
mod family;
mod handler;
pub mod lifecycle;
mod session;

pub use config::{HandlerConfig, MultiTransportSelector, DEFAULT_LOOPBACK_ADDRESS};
pub use configurator::TransportConfigurator;
pub use error::{Component, ErrorKind, SessionError};
pub use family::{map_family, NetworkFamily};
pub use handler::SessionHandler;
pub use lifecycle::{ConnectionRoute, ConnectionState, Established, Phase};
pub use session::{
    DirectNetworkOptions, ListenEndpoint, PublishEndpoint, Role, SessionConfiguration, Topology,
};

// Re-export the capability surface so callers need a single dependency.
pub use netstart_transport;
