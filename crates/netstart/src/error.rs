use crate::family::NetworkFamily;
use crate::session::{Role, Topology};

use std::fmt;

/// Which half of a session a connection error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Server,
    Client,
}

impl Component {
    pub fn is_server(self) -> bool {
        self == Component::Server
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Server => write!(f, "server"),
            Component::Client => write!(f, "client"),
        }
    }
}

/// Errors returned by session start/stop.
///
/// Every failure path of the adapter ends up here; nothing panics across
/// the [`SessionHandler`](crate::SessionHandler) boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("invalid session configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("topology {topology} is not supported")]
    UnsupportedMode { topology: Topology },

    #[error("listen address {address:?} has an invalid network family")]
    InvalidAddress { address: String },

    #[error("network family {family} is not supported for listen address {address:?}")]
    UnsupportedAddressFamily {
        address: String,
        family: NetworkFamily,
    },

    #[error("transport lacks capability: {capability}")]
    TransportCapability { capability: String },

    #[error("multi-transport index {index} is out of range ({count} transports)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("failed to start {component} connection (role {role}, topology {topology})")]
    ConnectionStart {
        component: Component,
        role: Role,
        topology: Topology,
    },

    #[error("failed to stop {component} connection (role {role}, topology {topology})")]
    ConnectionStop {
        component: Component,
        role: Role,
        topology: Topology,
    },
}

/// Fieldless classification of a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidConfiguration,
    UnsupportedMode,
    InvalidAddress,
    UnsupportedAddressFamily,
    TransportCapability,
    IndexOutOfRange,
    ConnectionStart,
    ConnectionStop,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::InvalidConfiguration { .. } => ErrorKind::InvalidConfiguration,
            SessionError::UnsupportedMode { .. } => ErrorKind::UnsupportedMode,
            SessionError::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            SessionError::UnsupportedAddressFamily { .. } => ErrorKind::UnsupportedAddressFamily,
            SessionError::TransportCapability { .. } => ErrorKind::TransportCapability,
            SessionError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            SessionError::ConnectionStart { .. } => ErrorKind::ConnectionStart,
            SessionError::ConnectionStop { .. } => ErrorKind::ConnectionStop,
        }
    }

    /// The failing half, for connection start/stop errors.
    pub fn component(&self) -> Option<Component> {
        match self {
            SessionError::ConnectionStart { component, .. }
            | SessionError::ConnectionStop { component, .. } => Some(*component),
            _ => None,
        }
    }

    /// True when the error was raised before any connection call was made.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(
            self,
            SessionError::ConnectionStart { .. } | SessionError::ConnectionStop { .. }
        )
    }

    pub(crate) fn missing(field: &str, role: Role, topology: Topology) -> Self {
        SessionError::InvalidConfiguration {
            reason: format!("{field} is required for role {role} with topology {topology}"),
        }
    }
}
