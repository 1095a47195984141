//! Connection lifecycle: start and stop server/client connections per role.
//!
//! State is explicit. [`start`] returns the new [`ConnectionState`];
//! [`stop`] takes the state a successful start returned. Nothing is
//! remembered between calls, which keeps the role/topology that stop acts
//! on equal to what the last successful start actually brought up.
//!
//! ```text
//! Idle ──start──▶ Starting ──▶ Running ──stop──▶ Stopping ──▶ Idle
//!                     │                              │
//!                     └──────────▶ Failed ◀──────────┘
//! ```

use crate::config::HandlerConfig;
use crate::configurator::TransportConfigurator;
use crate::error::{Component, SessionError};
use crate::session::{Role, SessionConfiguration, Topology};

use netstart_transport::{TransportAggregator, TransportCapabilities};
use tracing::{debug, info, warn};

// ── State ──────────────────────────────────────────────────────────────

/// Lifecycle phase of a session handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// How connections were started, so stop can take the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRoute {
    /// Through the server and client managers.
    Managers,
    /// Through sub-transport `index` of an aggregator.
    Aggregated { index: usize },
}

/// What the last successful start brought up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Established {
    pub role: Role,
    pub topology: Topology,
    pub route: ConnectionRoute,
}

/// Connection state of one handler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub phase: Phase,
    /// Set by a successful start, cleared by a successful stop.
    pub established: Option<Established>,
}

impl ConnectionState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn running(established: Established) -> Self {
        Self {
            phase: Phase::Running,
            established: Some(established),
        }
    }

    /// Same tracking, different phase.
    pub fn with_phase(&self, phase: Phase) -> Self {
        Self {
            phase,
            established: self.established,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn current_role(&self) -> Option<Role> {
        self.established.map(|e| e.role)
    }

    pub fn current_topology(&self) -> Option<Topology> {
        self.established.map(|e| e.topology)
    }
}

// ── Start ──────────────────────────────────────────────────────────────

/// Check `session` against the transport without touching it.
///
/// Validation, multi-transport selection, address family and relay
/// capability. A session rejected here has made no transport call except
/// capability queries, so the caller's state stays valid.
pub fn prepare(
    caps: &TransportCapabilities,
    config: &HandlerConfig,
    session: &SessionConfiguration,
) -> Result<ConnectionRoute, SessionError> {
    TransportConfigurator::new(caps, config).check(session)
}

/// Bring up the connections `session` asks for.
///
/// Order: [`prepare`], stop leftover connections, configure the transport,
/// start the server (Server/Host), start the client (Client/Host). The
/// first failure is returned and nothing after it runs: a failed server
/// start skips the client start. A session rejected by `prepare` makes no
/// transport call besides capability queries.
///
/// A failed client start takes down the server this attempt brought up,
/// so a failed start never leaves a half running.
pub async fn start(
    caps: &TransportCapabilities,
    config: &HandlerConfig,
    session: &SessionConfiguration,
) -> Result<ConnectionState, SessionError> {
    let (role, topology) = (session.role, session.topology);
    prepare(caps, config, session)?;
    info!(%role, %topology, "session start");

    stop_leftovers(caps).await;

    let route = TransportConfigurator::new(caps, config).apply(session)?;
    let established = Established {
        role,
        topology,
        route,
    };

    if role.runs_server() {
        start_component(caps, route, Component::Server, role, topology).await?;
    }
    if role.runs_client() {
        if let Err(err) = start_component(caps, route, Component::Client, role, topology).await {
            if role.runs_server() {
                roll_back_server(caps, established).await;
            }
            return Err(err);
        }
    }

    info!(%role, %topology, ?route, "session running");
    Ok(ConnectionState::running(established))
}

/// Stop the server half of a start whose client half failed.
async fn roll_back_server(caps: &TransportCapabilities, established: Established) {
    warn!(role = %established.role, "client start failed; stopping the server it pairs with");
    if let Err(err) = stop_component(caps, established, Component::Server).await {
        warn!(error = %err, "server rollback failed");
    }
}

/// Stop whatever is still up before reconfiguring. Never an error.
async fn stop_leftovers(caps: &TransportCapabilities) {
    if caps.client.is_started() {
        warn!("stopping existing client connection before starting a new one");
        if !caps.client.stop_connection().await {
            warn!("existing client connection did not stop cleanly");
        }
    }
    if caps.server.is_any_server_started() {
        warn!("stopping existing server connection before starting a new one");
        if !caps.server.stop_connection(true).await {
            warn!("existing server connection did not stop cleanly");
        }
    }
}

fn aggregator(caps: &TransportCapabilities) -> Result<&dyn TransportAggregator, SessionError> {
    caps.transport
        .aggregator()
        .ok_or_else(|| SessionError::TransportCapability {
            capability: "multi-transport selection needs an aggregator transport".to_string(),
        })
}

async fn start_component(
    caps: &TransportCapabilities,
    route: ConnectionRoute,
    component: Component,
    role: Role,
    topology: Topology,
) -> Result<(), SessionError> {
    let started = match (route, component) {
        (ConnectionRoute::Aggregated { index }, _) => {
            aggregator(caps)?
                .start_connection(component.is_server(), index)
                .await
        }
        (ConnectionRoute::Managers, Component::Server) => caps.server.start_connection().await,
        (ConnectionRoute::Managers, Component::Client) => caps.client.start_connection().await,
    };

    if !started {
        warn!(%component, %role, %topology, ?route, "connection start failed");
        return Err(SessionError::ConnectionStart {
            component,
            role,
            topology,
        });
    }

    info!(%component, ?route, "connection started");
    Ok(())
}

// ── Stop ───────────────────────────────────────────────────────────────

/// Tear down what `state` says was started: client first, then server.
///
/// A half that is not running is skipped. With nothing established this
/// is a no-op returning an idle state.
pub async fn stop(
    caps: &TransportCapabilities,
    state: &ConnectionState,
) -> Result<ConnectionState, SessionError> {
    let Some(established) = state.established else {
        debug!("stop without an established session; nothing to do");
        return Ok(ConnectionState::idle());
    };
    let Established {
        role,
        topology,
        route,
    } = established;
    info!(%role, %topology, "session stop");

    if role.runs_client() {
        stop_component(caps, established, Component::Client).await?;
    }
    if role.runs_server() {
        stop_component(caps, established, Component::Server).await?;
    }

    info!(%role, %topology, ?route, "session stopped");
    Ok(ConnectionState::idle())
}

async fn stop_component(
    caps: &TransportCapabilities,
    established: Established,
    component: Component,
) -> Result<(), SessionError> {
    let running = match component {
        Component::Server => caps.server.is_any_server_started(),
        Component::Client => caps.client.is_started(),
    };
    if !running {
        debug!(%component, "not started; nothing to stop");
        return Ok(());
    }

    let stopped = match (established.route, component) {
        (ConnectionRoute::Aggregated { index }, _) => {
            aggregator(caps)?
                .stop_connection(component.is_server(), index)
                .await
        }
        (ConnectionRoute::Managers, Component::Server) => caps.server.stop_connection(true).await,
        (ConnectionRoute::Managers, Component::Client) => caps.client.stop_connection().await,
    };

    if !stopped {
        warn!(%component, role = %established.role, "connection stop failed");
        return Err(SessionError::ConnectionStop {
            component,
            role: established.role,
            topology: established.topology,
        });
    }

    info!(%component, "connection stopped");
    Ok(())
}
