//! samba-instance binary: a function instance behind the SAMBA proxy
//!
//! Run with:
//! ```bash
//! cargo run -p samba-client --bin samba-instance -- --proxy http://localhost:8080 --listen 127.0.0.1:8081
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use samba_client::{InstanceNode, ProxyClient};
use samba_core::pre::MockScheme;
use samba_core::InstanceId;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "samba-instance")]
#[command(about = "Function instance that registers with a SAMBA proxy")]
struct Args {
    /// Proxy base URL
    #[arg(long, default_value = "http://localhost:8080")]
    proxy: String,

    /// Listen address
    #[arg(long, default_value = "127.0.0.1:8081")]
    listen: SocketAddr,

    /// Identifier registered with the proxy; the proxy calls back on it
    #[arg(long)]
    id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("samba_client=info".parse()?))
        .init();

    let args = Args::parse();
    let id = InstanceId::new(args.id.unwrap_or_else(|| format!("http://{}", args.listen)));

    let proxy = ProxyClient::new(args.proxy);
    let params = proxy.public_params().await?;
    let node = Arc::new(InstanceNode::new(id.clone(), Arc::new(MockScheme), params)?);
    proxy.register_public_key(&id, node.public_key()).await?;
    tracing::info!(instance = %id, proxy = proxy.base_url(), "Registered with proxy");

    let listener = TcpListener::bind(args.listen).await?;
    tracing::info!("Instance listening on {}", listener.local_addr()?);
    axum::serve(listener, node.router())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
