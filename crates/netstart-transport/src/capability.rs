use crate::{IpVersion, RelayData, TransportKind};

use std::fmt;
use std::sync::Arc;

/// The transport as seen by the session adapter.
///
/// Setters configure the next connection start; they do not open sockets.
/// Optional capabilities are discovered by query instead of downcasting:
/// a transport that cannot take relay payloads returns `None` from
/// [`relay`](Transport::relay), a single transport returns `None` from
/// [`aggregator`](Transport::aggregator).
pub trait Transport: Send + Sync {
    /// Address and IP version the server side binds to.
    fn set_server_bind_address(&self, address: &str, ip_version: IpVersion);

    /// Port shared by the server bind and the client target.
    fn set_port(&self, port: u16);

    /// Address the client side connects to.
    fn set_client_address(&self, address: &str);

    /// Relay configuration capability, if the transport has one.
    fn relay(&self) -> Option<&dyn RelayTransport> {
        None
    }

    /// Multi-transport capability, if this transport aggregates others.
    fn aggregator(&self) -> Option<&dyn TransportAggregator> {
        None
    }
}

/// Accepts relay allocation payloads.
pub trait RelayTransport: Send + Sync {
    fn set_relay_server_data(&self, data: &RelayData);

    fn set_relay_client_data(&self, data: &RelayData);
}

/// A transport multiplexing several sub-transports, addressed by index.
#[async_trait::async_trait]
pub trait TransportAggregator: Send + Sync {
    /// Route client connections through the first sub-transport of `kind`.
    ///
    /// Returns `false` when no such sub-transport exists.
    fn select_client_transport(&self, kind: TransportKind) -> bool;

    /// Sub-transport names, in index order.
    fn transport_names(&self) -> Vec<String>;

    fn transport_count(&self) -> usize {
        self.transport_names().len()
    }

    /// Start the server (`as_server`) or client side on sub-transport `index`.
    async fn start_connection(&self, as_server: bool, index: usize) -> bool;

    /// Stop the server (`as_server`) or client side on sub-transport `index`.
    async fn stop_connection(&self, as_server: bool, index: usize) -> bool;
}

/// Server side of the non-aggregated path.
#[async_trait::async_trait]
pub trait ServerManager: Send + Sync {
    fn is_any_server_started(&self) -> bool;

    async fn start_connection(&self) -> bool;

    /// `immediate` drops clients without a graceful disconnect.
    async fn stop_connection(&self, immediate: bool) -> bool;
}

/// Client side of the non-aggregated path.
#[async_trait::async_trait]
pub trait ClientManager: Send + Sync {
    fn is_started(&self) -> bool;

    async fn start_connection(&self) -> bool;

    async fn stop_connection(&self) -> bool;
}

/// Everything the session adapter needs, injected at construction.
#[derive(Clone)]
pub struct TransportCapabilities {
    pub transport: Arc<dyn Transport>,
    pub server: Arc<dyn ServerManager>,
    pub client: Arc<dyn ClientManager>,
}

impl TransportCapabilities {
    pub fn new(
        transport: Arc<dyn Transport>,
        server: Arc<dyn ServerManager>,
        client: Arc<dyn ClientManager>,
    ) -> Self {
        Self {
            transport,
            server,
            client,
        }
    }

    /// Use one object for all three roles.
    pub fn from_shared<T>(shared: T) -> Self
    where
        T: Transport + ServerManager + ClientManager + 'static,
    {
        let shared = Arc::new(shared);
        Self {
            transport: shared.clone(),
            server: shared.clone(),
            client: shared,
        }
    }
}

impl fmt::Debug for TransportCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportCapabilities")
            .field("relay", &self.transport.relay().is_some())
            .field(
                "sub_transports",
                &self.transport.aggregator().map(|a| a.transport_names()),
            )
            .finish()
    }
}
