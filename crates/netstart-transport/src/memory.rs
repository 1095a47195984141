//! In-memory transport.
//!
//! Implements every capability of the surface without touching the network.
//! Each call is appended to a shared log so tests and the CLI can check
//! exactly what an adapter did, and in which order. Clones share state.

use crate::capability::{ClientManager, RelayTransport, ServerManager, Transport, TransportAggregator};
use crate::{IpVersion, RelayData, TransportKind};

use std::sync::{Arc, Mutex, MutexGuard};

/// One observed call on a [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    SetServerBindAddress {
        address: String,
        ip_version: IpVersion,
    },
    SetPort(u16),
    SetClientAddress(String),
    SetRelayServerData(RelayData),
    SetRelayClientData(RelayData),
    SelectClientTransport(TransportKind),
    QueryServerStarted,
    QueryClientStarted,
    StartServer,
    StartClient,
    StopServer { immediate: bool },
    StopClient,
    StartConnection { as_server: bool, index: usize },
    StopConnection { as_server: bool, index: usize },
}

impl TransportCall {
    /// True for calls that start a server or client connection.
    pub fn is_start(&self) -> bool {
        matches!(
            self,
            TransportCall::StartServer
                | TransportCall::StartClient
                | TransportCall::StartConnection { .. }
        )
    }

    /// True for calls that stop a server or client connection.
    pub fn is_stop(&self) -> bool {
        matches!(
            self,
            TransportCall::StopServer { .. }
                | TransportCall::StopClient
                | TransportCall::StopConnection { .. }
        )
    }

    /// True for setters that configure the transport.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TransportCall::SetServerBindAddress { .. }
                | TransportCall::SetPort(_)
                | TransportCall::SetClientAddress(_)
                | TransportCall::SetRelayServerData(_)
                | TransportCall::SetRelayClientData(_)
                | TransportCall::SelectClientTransport(_)
        )
    }
}

#[derive(Debug, Default)]
struct Failures {
    server_start: bool,
    client_start: bool,
    server_stop: bool,
    client_stop: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    calls: Vec<TransportCall>,
    server_started: bool,
    client_started: bool,
    client_transport: Option<TransportKind>,
    failures: Failures,
}

/// Builder for [`MemoryTransport`].
#[derive(Debug, Default)]
pub struct MemoryTransportBuilder {
    relay: bool,
    sub_transports: Vec<TransportKind>,
}

impl MemoryTransportBuilder {
    /// Advertise the relay capability on a single transport.
    pub fn relay(mut self, enabled: bool) -> Self {
        self.relay = enabled;
        self
    }

    /// Turn the transport into an aggregator over `kinds`, in index order.
    ///
    /// The aggregator is relay-capable when one of its sub-transports is
    /// [`TransportKind::Relay`].
    pub fn sub_transports(mut self, kinds: impl IntoIterator<Item = TransportKind>) -> Self {
        self.sub_transports = kinds.into_iter().collect();
        self
    }

    pub fn build(self) -> MemoryTransport {
        let relay = self.relay || self.sub_transports.contains(&TransportKind::Relay);
        MemoryTransport {
            relay,
            sub_transports: self.sub_transports.into(),
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }
}

/// A transport that records calls instead of doing I/O.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    relay: bool,
    sub_transports: Arc<[TransportKind]>,
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// A single transport with no relay capability.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> MemoryTransportBuilder {
        MemoryTransportBuilder::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking test thread must not hide the log from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: TransportCall) {
        tracing::trace!(?call, "memory transport call");
        self.lock().calls.push(call);
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn is_server_running(&self) -> bool {
        self.lock().server_started
    }

    pub fn is_client_running(&self) -> bool {
        self.lock().client_started
    }

    /// Sub-transport selected for client connections, if any.
    pub fn selected_client_transport(&self) -> Option<TransportKind> {
        self.lock().client_transport
    }

    /// Pretend a server connection is already up (left over from an
    /// earlier session). Not recorded as a call.
    pub fn mark_server_started(&self) {
        self.lock().server_started = true;
    }

    /// Pretend a client connection is already up. Not recorded as a call.
    pub fn mark_client_started(&self) {
        self.lock().client_started = true;
    }

    /// Make server starts report `false`.
    pub fn fail_server_start(&self, fail: bool) {
        self.lock().failures.server_start = fail;
    }

    /// Make client starts report `false`.
    pub fn fail_client_start(&self, fail: bool) {
        self.lock().failures.client_start = fail;
    }

    /// Make stops of a running server report `false`.
    pub fn fail_server_stop(&self, fail: bool) {
        self.lock().failures.server_stop = fail;
    }

    /// Make stops of a running client report `false`.
    pub fn fail_client_stop(&self, fail: bool) {
        self.lock().failures.client_stop = fail;
    }

    fn start_side(&self, as_server: bool) -> bool {
        let mut state = self.lock();
        if as_server {
            if state.failures.server_start {
                return false;
            }
            state.server_started = true;
        } else {
            if state.failures.client_start {
                return false;
            }
            state.client_started = true;
        }
        true
    }

    fn stop_side(&self, as_server: bool) -> bool {
        let mut state = self.lock();
        if as_server {
            if !state.server_started {
                return true;
            }
            if state.failures.server_stop {
                return false;
            }
            state.server_started = false;
        } else {
            if !state.client_started {
                return true;
            }
            if state.failures.client_stop {
                return false;
            }
            state.client_started = false;
        }
        true
    }
}

impl Transport for MemoryTransport {
    fn set_server_bind_address(&self, address: &str, ip_version: IpVersion) {
        self.record(TransportCall::SetServerBindAddress {
            address: address.to_string(),
            ip_version,
        });
    }

    fn set_port(&self, port: u16) {
        self.record(TransportCall::SetPort(port));
    }

    fn set_client_address(&self, address: &str) {
        self.record(TransportCall::SetClientAddress(address.to_string()));
    }

    fn relay(&self) -> Option<&dyn RelayTransport> {
        if self.relay {
            Some(self)
        } else {
            None
        }
    }

    fn aggregator(&self) -> Option<&dyn TransportAggregator> {
        if self.sub_transports.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl RelayTransport for MemoryTransport {
    fn set_relay_server_data(&self, data: &RelayData) {
        self.record(TransportCall::SetRelayServerData(data.clone()));
    }

    fn set_relay_client_data(&self, data: &RelayData) {
        self.record(TransportCall::SetRelayClientData(data.clone()));
    }
}

#[async_trait::async_trait]
impl TransportAggregator for MemoryTransport {
    fn select_client_transport(&self, kind: TransportKind) -> bool {
        self.record(TransportCall::SelectClientTransport(kind));
        if !self.sub_transports.contains(&kind) {
            return false;
        }
        self.lock().client_transport = Some(kind);
        true
    }

    fn transport_names(&self) -> Vec<String> {
        self.sub_transports.iter().map(ToString::to_string).collect()
    }

    fn transport_count(&self) -> usize {
        self.sub_transports.len()
    }

    async fn start_connection(&self, as_server: bool, index: usize) -> bool {
        self.record(TransportCall::StartConnection { as_server, index });
        index < self.sub_transports.len() && self.start_side(as_server)
    }

    async fn stop_connection(&self, as_server: bool, index: usize) -> bool {
        self.record(TransportCall::StopConnection { as_server, index });
        index < self.sub_transports.len() && self.stop_side(as_server)
    }
}

#[async_trait::async_trait]
impl ServerManager for MemoryTransport {
    fn is_any_server_started(&self) -> bool {
        self.record(TransportCall::QueryServerStarted);
        self.lock().server_started
    }

    async fn start_connection(&self) -> bool {
        self.record(TransportCall::StartServer);
        self.start_side(true)
    }

    async fn stop_connection(&self, immediate: bool) -> bool {
        self.record(TransportCall::StopServer { immediate });
        self.stop_side(true)
    }
}

#[async_trait::async_trait]
impl ClientManager for MemoryTransport {
    fn is_started(&self) -> bool {
        self.record(TransportCall::QueryClientStarted);
        self.lock().client_started
    }

    async fn start_connection(&self) -> bool {
        self.record(TransportCall::StartClient);
        self.start_side(false)
    }

    async fn stop_connection(&self) -> bool {
        self.record(TransportCall::StopClient);
        self.stop_side(false)
    }
}
