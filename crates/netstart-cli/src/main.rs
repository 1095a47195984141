mod session_args;

use clap::{Parser, Subcommand};
use netstart::{HandlerConfig, SessionHandler};
use netstart_transport::{MemoryTransport, TransportCapabilities, TransportKind};
use session_args::SessionArgs;

#[derive(Parser)]
#[command(
    name = "netstart",
    about = "Replay a session description against an in-memory transport"
)]
struct Cli {
    /// Advertise the relay capability on a single transport.
    #[arg(long)]
    relay: bool,

    /// Make the transport an aggregator over these sub-transports (comma-separated).
    #[arg(long, value_delimiter = ',')]
    sub_transports: Vec<TransportKind>,

    /// Route connections through this sub-transport index.
    #[arg(long)]
    multi_transport_index: Option<usize>,

    /// Address a host's client connects to.
    #[arg(long)]
    loopback: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start then stop the session, printing every transport call.
    Check {
        #[command(flatten)]
        session: SessionArgs,
        /// Make server starts fail.
        #[arg(long)]
        fail_server_start: bool,
        /// Make client starts fail.
        #[arg(long)]
        fail_client_start: bool,
        /// Leave the session running (skip stop).
        #[arg(long)]
        no_stop: bool,
    },

    /// Print the session description as JSON.
    Template {
        #[command(flatten)]
        session: SessionArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let transport = MemoryTransport::builder()
        .relay(cli.relay)
        .sub_transports(cli.sub_transports.iter().copied())
        .build();
    tracing::debug!(
        relay = cli.relay,
        sub_transports = ?cli.sub_transports,
        "memory transport ready"
    );

    let mut config = HandlerConfig::new();
    if let Some(index) = cli.multi_transport_index {
        config = config.multi_transport(index);
    }
    if let Some(loopback) = cli.loopback.clone() {
        config = config.loopback_address(loopback);
    }

    match cli.command {
        Command::Template { session } => {
            let session = session.load()?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        Command::Check {
            session,
            fail_server_start,
            fail_client_start,
            no_stop,
        } => {
            let session = session.load()?;
            transport.fail_server_start(fail_server_start);
            transport.fail_client_start(fail_client_start);

            eprintln!("netstart v{}", env!("CARGO_PKG_VERSION"));
            eprintln!("Role: {}  Topology: {}", session.role, session.topology);
            eprintln!();

            let handler = SessionHandler::new(
                TransportCapabilities::from_shared(transport.clone()),
                config,
            );

            tracing::debug!(config = ?handler.config(), "handler ready");

            let started = handler.start(&session).await;
            print_calls("start", &transport);
            let state = started.inspect_err(|err| {
                if err.is_configuration_error() {
                    eprintln!("session rejected before any connection was started");
                }
            })?;
            println!("state: {:?}", state.phase);

            if !no_stop {
                transport.clear_calls();
                let stopped = handler.stop().await;
                print_calls("stop", &transport);
                let state = stopped?;
                println!("state: {:?}", state.phase);
            }
        }
    }

    Ok(())
}

fn print_calls(label: &str, transport: &MemoryTransport) {
    println!("── {label} ──");
    for (i, call) in transport.calls().iter().enumerate() {
        println!("{:>3}  {call:?}", i + 1);
    }
}
