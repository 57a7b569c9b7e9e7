//! SAMBA proxy server

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusHandle;
use samba_core::ProxyConfig;
use tokio::net::TcpListener;

use crate::error::{Result, ServerError};
use crate::routes::create_router;
use crate::state::{ProxyState, SharedState};

/// The proxy: shared state plus a listen address
pub struct ProxyServer {
    state: SharedState,
    addr: SocketAddr,
    max_concurrent_requests: usize,
}

impl ProxyServer {
    /// Bind and serve until ctrl-c
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        tracing::info!("Proxy service running on {}", listener.local_addr()?);
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let router = create_router(self.state, self.max_concurrent_requests);
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the server state for testing
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Builder for ProxyServer
pub struct ServerBuilder {
    config: ProxyConfig,
    metrics: Option<PrometheusHandle>,
}

impl ServerBuilder {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.config.listen_addr = addr;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.listen_addr = ([0, 0, 0, 0], port).into();
        self
    }

    /// Expose `/metrics` through this recorder
    pub fn metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn build(self) -> Result<ProxyServer> {
        self.config.validate()?;
        let mut state = ProxyState::from_config(&self.config)?;
        if let Some(handle) = self.metrics {
            state = state.with_metrics(handle);
        }

        Ok(ProxyServer {
            state: SharedState::new(state),
            addr: self.config.listen_addr,
            max_concurrent_requests: self.config.max_concurrent_requests,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_addr() {
        let server = ServerBuilder::new(ProxyConfig::default()).port(9090).build().unwrap();
        assert_eq!(server.addr().port(), 9090);
        assert!(server.state().directory.is_empty());
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = ProxyConfig {
            max_concurrent_requests: 0,
            ..Default::default()
        };
        assert!(ServerBuilder::new(config).build().is_err());
    }
}
