use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use netstart::{Role, SessionConfiguration, Topology};
use netstart_transport::RelayData;

/// Session description, from a JSON file or from flags.
#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Session description file (JSON). When set, the flags below are ignored.
    #[arg(long)]
    pub session: Option<PathBuf>,

    /// server, client or host.
    #[arg(long, default_value = "host")]
    pub role: Role,

    /// direct, relay or distributed-authority.
    #[arg(long, default_value = "direct")]
    pub topology: Topology,

    /// Listen endpoint for server and host roles.
    #[arg(long, default_value = "127.0.0.1:7770")]
    pub listen: SocketAddr,

    /// Endpoint clients connect to.
    #[arg(long, default_value = "127.0.0.1:7770")]
    pub publish: SocketAddr,

    /// Relay endpoint for both allocation payloads (relay topology).
    #[arg(long, default_value = "127.0.0.1:3478")]
    pub relay_endpoint: String,
}

impl SessionArgs {
    pub fn load(&self) -> anyhow::Result<SessionConfiguration> {
        let Some(path) = &self.session else {
            return Ok(self.flags_session());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading session file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing session file {}", path.display()))
    }

    fn flags_session(&self) -> SessionConfiguration {
        match self.topology {
            Topology::Relay => SessionConfiguration::relay(
                self.role,
                RelayData::new(self.relay_endpoint.clone(), Vec::new()),
                RelayData::new(self.relay_endpoint.clone(), Vec::new()),
            ),
            topology => SessionConfiguration::new(self.role, topology)
                .with_listen(self.listen.into())
                .with_publish(self.publish.into()),
        }
    }
}
