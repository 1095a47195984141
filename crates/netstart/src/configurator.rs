//! Applies a validated session description to the transport.
//!
//! Everything here runs before any connection is started. Each failure
//! returns before the first setter it would have guarded, so a rejected
//! configuration never leaves a half-configured transport behind.

use crate::config::HandlerConfig;
use crate::error::SessionError;
use crate::family::map_family;
use crate::lifecycle::ConnectionRoute;
use crate::session::{Role, SessionConfiguration, Topology};

use netstart_transport::{RelayTransport, TransportCapabilities, TransportKind};
use tracing::{debug, info};

/// Configures the transport for one start attempt.
///
/// No connection calls, no state: reads the session and handler config,
/// writes transport settings, returns the route connections will take.
pub struct TransportConfigurator<'a> {
    caps: &'a TransportCapabilities,
    config: &'a HandlerConfig,
}

impl<'a> TransportConfigurator<'a> {
    pub fn new(caps: &'a TransportCapabilities, config: &'a HandlerConfig) -> Self {
        Self { caps, config }
    }

    /// Where server and client starts go, checking the multi-transport
    /// selector against the aggregator.
    pub fn resolve_route(&self) -> Result<ConnectionRoute, SessionError> {
        let Some(index) = self.config.selector().active_index() else {
            return Ok(ConnectionRoute::Managers);
        };

        let aggregator =
            self.caps
                .transport
                .aggregator()
                .ok_or_else(|| SessionError::TransportCapability {
                    capability: "multi-transport selection needs an aggregator transport"
                        .to_string(),
                })?;

        let count = aggregator.transport_count();
        if index >= count {
            return Err(SessionError::IndexOutOfRange { index, count });
        }

        debug!(index, count, "routing connections through sub-transport");
        Ok(ConnectionRoute::Aggregated { index })
    }

    /// Every check `apply` makes, without touching the transport.
    ///
    /// Only capability queries run here, so a session rejected by `check`
    /// leaves the transport exactly as it was.
    pub fn check(&self, session: &SessionConfiguration) -> Result<ConnectionRoute, SessionError> {
        session.validate()?;
        let route = self.resolve_route()?;

        match (&session.direct_listen, session.topology) {
            (Some(listen), Topology::Direct) if session.role.runs_server() => {
                map_family(&listen.address, listen.family)?;
            }
            (_, Topology::Relay) => {
                self.relay_capability()?;
            }
            _ => {}
        }

        Ok(route)
    }

    /// Check, then apply topology settings.
    pub fn apply(&self, session: &SessionConfiguration) -> Result<ConnectionRoute, SessionError> {
        let route = self.check(session)?;

        match session.topology {
            Topology::Direct => self.apply_direct(session)?,
            Topology::Relay => self.apply_relay(session)?,
            // Rejected by validate().
            Topology::DistributedAuthority | Topology::Unknown => {}
        }

        Ok(route)
    }

    fn apply_direct(&self, session: &SessionConfiguration) -> Result<(), SessionError> {
        let (role, topology) = (session.role, session.topology);
        let transport = &self.caps.transport;

        if role.runs_server() {
            let listen = session
                .direct_listen
                .as_ref()
                .ok_or_else(|| SessionError::missing("direct_listen", role, topology))?;
            let ip_version = map_family(&listen.address, listen.family)?;

            transport.set_server_bind_address(&listen.address, ip_version);
            transport.set_port(listen.port);
            info!(
                address = %listen.address,
                port = listen.port,
                %ip_version,
                "server bind address set"
            );

            if role == Role::Host {
                let loopback = self.config.loopback();
                transport.set_client_address(loopback);
                transport.set_port(listen.port);
                info!(address = %loopback, port = listen.port, "host client address set");
            }
        }

        if role == Role::Client {
            let publish = session
                .direct_publish
                .as_ref()
                .ok_or_else(|| SessionError::missing("direct_publish", role, topology))?;

            transport.set_client_address(&publish.address);
            transport.set_port(publish.port);
            info!(address = %publish.address, port = publish.port, "client address set");
        }

        Ok(())
    }

    fn relay_capability(&self) -> Result<&'a dyn RelayTransport, SessionError> {
        self.caps
            .transport
            .relay()
            .ok_or_else(|| SessionError::TransportCapability {
                capability: "relay data".to_string(),
            })
    }

    fn apply_relay(&self, session: &SessionConfiguration) -> Result<(), SessionError> {
        let (role, topology) = (session.role, session.topology);

        let relay = self.relay_capability()?;
        let server_data = session
            .relay_server_data
            .as_ref()
            .ok_or_else(|| SessionError::missing("relay_server_data", role, topology))?;
        let client_data = session
            .relay_client_data
            .as_ref()
            .ok_or_else(|| SessionError::missing("relay_client_data", role, topology))?;

        if let Some(aggregator) = self.caps.transport.aggregator() {
            if !aggregator.select_client_transport(TransportKind::Relay) {
                return Err(SessionError::TransportCapability {
                    capability: "relay sub-transport in aggregator".to_string(),
                });
            }
            info!("aggregator client transport set to relay");
        }

        // Both payloads go to the transport whatever the role.
        relay.set_relay_server_data(server_data);
        relay.set_relay_client_data(client_data);
        info!(
            server = %server_data.endpoint,
            client = %client_data.endpoint,
            "relay data applied"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::family::NetworkFamily;
    use crate::session::{ListenEndpoint, PublishEndpoint};

    use netstart_transport::{IpVersion, MemoryTransport, RelayData, TransportCall};

    fn setup(transport: &MemoryTransport) -> TransportCapabilities {
        TransportCapabilities::from_shared(transport.clone())
    }

    fn relay_session(role: Role) -> SessionConfiguration {
        SessionConfiguration::relay(
            role,
            RelayData::new("relay.example:443", vec![1]),
            RelayData::new("relay.example:443", vec![2]),
        )
    }

    #[test]
    fn host_binds_and_self_connects_over_loopback() {
        let transport = MemoryTransport::new();
        let caps = setup(&transport);
        let config = HandlerConfig::default();
        let session = SessionConfiguration::new(Role::Host, Topology::Direct)
            .with_listen(ListenEndpoint::new("0.0.0.0", 7777, NetworkFamily::Ipv4));

        let route = TransportConfigurator::new(&caps, &config)
            .apply(&session)
            .unwrap();

        assert_eq!(route, ConnectionRoute::Managers);
        assert_eq!(
            transport.calls(),
            vec![
                TransportCall::SetServerBindAddress {
                    address: "0.0.0.0".into(),
                    ip_version: IpVersion::Ipv4,
                },
                TransportCall::SetPort(7777),
                TransportCall::SetClientAddress("127.0.0.1".into()),
                TransportCall::SetPort(7777),
            ]
        );
    }

    #[test]
    fn client_targets_publish_endpoint() {
        let transport = MemoryTransport::new();
        let caps = setup(&transport);
        let config = HandlerConfig::default();
        let session = SessionConfiguration::new(Role::Client, Topology::Direct)
            .with_publish(PublishEndpoint::new("203.0.113.7", 7770));

        TransportConfigurator::new(&caps, &config)
            .apply(&session)
            .unwrap();

        assert_eq!(
            transport.calls(),
            vec![
                TransportCall::SetClientAddress("203.0.113.7".into()),
                TransportCall::SetPort(7770),
            ]
        );
    }

    #[test]
    fn host_loopback_is_configurable() {
        let transport = MemoryTransport::new();
        let caps = setup(&transport);
        let config = HandlerConfig::default().loopback_address("::1");
        let session = SessionConfiguration::new(Role::Host, Topology::Direct)
            .with_listen(ListenEndpoint::new("::", 9000, NetworkFamily::Ipv6));

        TransportConfigurator::new(&caps, &config)
            .apply(&session)
            .unwrap();

        assert!(transport
            .calls()
            .contains(&TransportCall::SetClientAddress("::1".into())));
    }

    #[test]
    fn invalid_family_touches_nothing() {
        let transport = MemoryTransport::new();
        let caps = setup(&transport);
        let config = HandlerConfig::default();
        let session = SessionConfiguration::new(Role::Server, Topology::Direct)
            .with_listen(ListenEndpoint::new("", 7777, NetworkFamily::Invalid));

        let err = TransportConfigurator::new(&caps, &config)
            .apply(&session)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidAddress);
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn relay_requires_capability() {
        let transport = MemoryTransport::new();
        let caps = setup(&transport);
        let config = HandlerConfig::default();

        let err = TransportConfigurator::new(&caps, &config)
            .apply(&relay_session(Role::Client))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransportCapability);
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn relay_applies_both_payloads_for_server_role() {
        let transport = MemoryTransport::builder().relay(true).build();
        let caps = setup(&transport);
        let config = HandlerConfig::default();

        TransportConfigurator::new(&caps, &config)
            .apply(&relay_session(Role::Server))
            .unwrap();

        assert_eq!(
            transport.calls(),
            vec![
                TransportCall::SetRelayServerData(RelayData::new("relay.example:443", vec![1])),
                TransportCall::SetRelayClientData(RelayData::new("relay.example:443", vec![2])),
            ]
        );
    }

    #[test]
    fn relay_on_aggregator_selects_relay_client_transport_first() {
        let transport = MemoryTransport::builder()
            .sub_transports([TransportKind::Udp, TransportKind::Relay])
            .build();
        let caps = setup(&transport);
        let config = HandlerConfig::default();

        TransportConfigurator::new(&caps, &config)
            .apply(&relay_session(Role::Client))
            .unwrap();

        let calls = transport.calls();
        assert_eq!(
            calls[0],
            TransportCall::SelectClientTransport(TransportKind::Relay)
        );
        assert_eq!(transport.selected_client_transport(), Some(TransportKind::Relay));
        assert_eq!(calls.len(), 3);
    }

    #[test]
    fn selector_out_of_range_fails_before_setters() {
        let transport = MemoryTransport::builder()
            .sub_transports([TransportKind::Udp, TransportKind::Relay])
            .build();
        let caps = setup(&transport);
        let config = HandlerConfig::default().multi_transport(2);
        let session = SessionConfiguration::new(Role::Server, Topology::Direct)
            .with_listen(ListenEndpoint::new("0.0.0.0", 7777, NetworkFamily::Ipv4));

        let err = TransportConfigurator::new(&caps, &config)
            .apply(&session)
            .unwrap_err();

        assert_eq!(err, SessionError::IndexOutOfRange { index: 2, count: 2 });
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn check_makes_no_transport_calls() {
        let transport = MemoryTransport::builder()
            .sub_transports([TransportKind::Udp, TransportKind::Relay])
            .build();
        let caps = setup(&transport);
        let config = HandlerConfig::default().multi_transport(1);
        let configurator = TransportConfigurator::new(&caps, &config);

        let route = configurator.check(&relay_session(Role::Host)).unwrap();
        assert_eq!(route, ConnectionRoute::Aggregated { index: 1 });

        let custom = SessionConfiguration::new(Role::Server, Topology::Direct)
            .with_listen(ListenEndpoint::new("mesh0", 7777, NetworkFamily::Custom(3)));
        let err = configurator.check(&custom).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAddressFamily);

        assert!(transport.calls().is_empty());
    }

    #[test]
    fn selector_needs_aggregator() {
        let transport = MemoryTransport::new();
        let caps = setup(&transport);
        let config = HandlerConfig::default().multi_transport(0);

        let err = TransportConfigurator::new(&caps, &config)
            .resolve_route()
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransportCapability);
    }

    #[test]
    fn selector_in_range_routes_through_aggregator() {
        let transport = MemoryTransport::builder()
            .sub_transports([TransportKind::Udp, TransportKind::WebSocket])
            .build();
        let caps = setup(&transport);
        let config = HandlerConfig::default().multi_transport(1);

        let route = TransportConfigurator::new(&caps, &config)
            .resolve_route()
            .unwrap();

        assert_eq!(route, ConnectionRoute::Aggregated { index: 1 });
    }
}
