//! Concurrent start/stop calls on one handler run one after the other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use netstart::{
    HandlerConfig, Phase, PublishEndpoint, Role, SessionConfiguration, SessionHandler, Topology,
};
use netstart_transport::{
    ClientManager, IpVersion, ServerManager, Transport, TransportCapabilities,
};

/// Client manager whose start and stop take a while, logging begin/end.
#[derive(Default)]
struct SlowClient {
    started: AtomicBool,
    events: Mutex<Vec<&'static str>>,
}

impl SlowClient {
    fn log(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }
}

impl Transport for SlowClient {
    fn set_server_bind_address(&self, _address: &str, _ip_version: IpVersion) {}
    fn set_port(&self, _port: u16) {}
    fn set_client_address(&self, _address: &str) {}
}

#[async_trait::async_trait]
impl ServerManager for SlowClient {
    fn is_any_server_started(&self) -> bool {
        false
    }

    async fn start_connection(&self) -> bool {
        true
    }

    async fn stop_connection(&self, _immediate: bool) -> bool {
        true
    }
}

#[async_trait::async_trait]
impl ClientManager for SlowClient {
    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    async fn start_connection(&self) -> bool {
        self.log("start-begin");
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.started.store(true, Ordering::SeqCst);
        self.log("start-end");
        true
    }

    async fn stop_connection(&self) -> bool {
        self.log("stop-begin");
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.started.store(false, Ordering::SeqCst);
        self.log("stop-end");
        true
    }
}

fn client_session() -> SessionConfiguration {
    SessionConfiguration::new(Role::Client, Topology::Direct)
        .with_publish(PublishEndpoint::new("198.51.100.20", 7770))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_calls_do_not_interleave() {
    let client = Arc::new(SlowClient::default());
    let caps = TransportCapabilities::new(client.clone(), client.clone(), client.clone());
    let handler = Arc::new(SessionHandler::new(caps, HandlerConfig::default()));

    let session = client_session();
    let first = {
        let handler = handler.clone();
        let session = session.clone();
        tokio::spawn(async move { handler.start(&session).await })
    };
    let second = {
        let handler = handler.clone();
        tokio::spawn(async move { handler.start(&session).await })
    };

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
    handler.stop().await.unwrap();

    let events = client.events.lock().unwrap().clone();
    // Second start stops the first client before starting its own.
    assert_eq!(
        events,
        vec![
            "start-begin",
            "start-end",
            "stop-begin",
            "stop-end",
            "start-begin",
            "start-end",
            "stop-begin",
            "stop-end",
        ]
    );
    assert_eq!(handler.state().await.phase, Phase::Idle);
}
