use crate::config::HandlerConfig;
use crate::error::SessionError;
use crate::lifecycle::{self, ConnectionState, Phase};
use crate::session::SessionConfiguration;

use netstart_transport::TransportCapabilities;
use tokio::sync::{watch, Mutex};

/// Session adapter bound to one transport.
///
/// Owns the connection state of that transport. `start` and `stop` hold an
/// internal lock for their whole run, so concurrent calls on one handler
/// execute one after the other. Phase changes, including the transient
/// `Starting` / `Stopping`, are published on a watch channel.
pub struct SessionHandler {
    caps: TransportCapabilities,
    config: HandlerConfig,
    state: Mutex<ConnectionState>,
    state_tx: watch::Sender<ConnectionState>,
}

impl SessionHandler {
    pub fn new(caps: TransportCapabilities, config: HandlerConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::idle());
        Self {
            caps,
            config,
            state: Mutex::new(ConnectionState::idle()),
            state_tx,
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &TransportCapabilities {
        &self.caps
    }

    /// Watch phase changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Current state. Waits for an in-flight start/stop to finish.
    pub async fn state(&self) -> ConnectionState {
        self.state.lock().await.clone()
    }

    fn publish(&self, state: &ConnectionState) {
        self.state_tx.send_replace(state.clone());
    }

    /// Start the session described by `session`.
    ///
    /// A session rejected before the transport is touched (validation,
    /// selector, address family, relay capability) leaves the state as it
    /// was. Any later failure moves the phase to `Failed` but keeps the
    /// role/topology of the last successful start, so `stop` never acts on
    /// a configuration that was not brought up.
    pub async fn start(
        &self,
        session: &SessionConfiguration,
    ) -> Result<ConnectionState, SessionError> {
        let mut state = self.state.lock().await;

        if let Err(err) = lifecycle::prepare(&self.caps, &self.config, session) {
            tracing::warn!(error = %err, role = %session.role, "session rejected");
            return Err(err);
        }

        self.publish(&state.with_phase(Phase::Starting));
        match lifecycle::start(&self.caps, &self.config, session).await {
            Ok(next) => {
                *state = next;
                self.publish(&state);
                Ok(state.clone())
            }
            Err(err) => {
                *state = state.with_phase(Phase::Failed);
                tracing::warn!(error = %err, "session start failed");
                self.publish(&state);
                Err(err)
            }
        }
    }

    /// Stop the connections of the last successful start.
    ///
    /// On failure the phase becomes `Failed` and tracking is kept, so a
    /// later `stop` retries the same halves.
    pub async fn stop(&self) -> Result<ConnectionState, SessionError> {
        let mut state = self.state.lock().await;
        self.publish(&state.with_phase(Phase::Stopping));

        match lifecycle::stop(&self.caps, &state).await {
            Ok(next) => {
                *state = next;
                self.publish(&state);
                Ok(state.clone())
            }
            Err(err) => {
                *state = state.with_phase(Phase::Failed);
                tracing::warn!(error = %err, "session stop failed");
                self.publish(&state);
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for SessionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandler")
            .field("caps", &self.caps)
            .field("config", &self.config)
            .finish()
    }
}
