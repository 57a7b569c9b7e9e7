//! samba-proxy binary: the SAMBA re-encryption proxy
//!
//! Run with:
//! ```bash
//! cargo run -p samba-server --bin samba-proxy -- --leader http://localhost:8081 --destination http://localhost:8082
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use samba_core::{InstanceId, ProxyConfig};
use samba_server::metrics::init_prometheus_recorder;
use samba_server::ServerBuilder;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "samba-proxy")]
#[command(about = "Key-management and routing proxy for PRE-sharing instances")]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Leader assigned to every function
    #[arg(long)]
    leader: Option<String>,

    /// Instance every message is delivered to
    #[arg(long)]
    destination: Option<String>,

    /// Deadline for outbound calls in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Maximum concurrently handled requests
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Hex-encoded public parameters (generated when omitted)
    #[arg(long)]
    params_seed: Option<String>,

    /// Do not install the Prometheus recorder
    #[arg(long)]
    no_metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("samba_server=info".parse()?)
                .add_directive("samba_core=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ProxyConfig::load(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(leader) = args.leader {
        config.default_leader = InstanceId::new(leader);
    }
    if let Some(destination) = args.destination {
        config.default_destination = InstanceId::new(destination);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.request_timeout_ms = timeout_ms;
    }
    if let Some(max) = args.max_concurrent {
        config.max_concurrent_requests = max;
    }
    if args.params_seed.is_some() {
        config.params_seed = args.params_seed;
    }

    let mut builder = ServerBuilder::new(config);
    if !args.no_metrics {
        builder = builder.metrics(init_prometheus_recorder()?);
    }

    let server = builder.build()?;
    server.run().await?;

    Ok(())
}
