//! Server state: registry, leader directory, broker and router

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use samba_core::pre::{MockScheme, PreScheme};
use samba_core::{
    DestinationSelectionPolicy, FixedDestination, FixedLeader, KeyRegistry, LeaderDirectory,
    LeaderSelectionPolicy, ProxyConfig, PublicParamsProvider,
};

use crate::broker::ReEncryptionBroker;
use crate::client::InstanceClient;
use crate::error::Result;
use crate::router::MessageRouter;

/// Everything the proxy shares across requests
pub struct ProxyState {
    pub registry: Arc<KeyRegistry>,
    pub directory: Arc<LeaderDirectory>,
    pub broker: Arc<ReEncryptionBroker>,
    pub router: MessageRouter,
    pub params: Arc<PublicParamsProvider>,
    pub scheme: Arc<dyn PreScheme>,
    pub metrics: Option<PrometheusHandle>,
}

impl ProxyState {
    /// Wire up the proxy with explicit policies and PRE backend
    pub fn new(
        config: &ProxyConfig,
        scheme: Arc<dyn PreScheme>,
        leader_policy: impl LeaderSelectionPolicy + 'static,
        destination_policy: Arc<dyn DestinationSelectionPolicy>,
    ) -> Result<Self> {
        let params = match config.params_bytes()? {
            Some(bytes) => PublicParamsProvider::from_bytes(scheme.as_ref(), bytes)?,
            None => PublicParamsProvider::generate(scheme.as_ref()),
        };
        let params = Arc::new(params);

        let client = InstanceClient::new(config.request_timeout())?;
        let registry = Arc::new(KeyRegistry::new());
        let directory = Arc::new(LeaderDirectory::new(leader_policy));
        let broker = Arc::new(ReEncryptionBroker::new(registry.clone(), client.clone()));
        let router = MessageRouter::new(
            directory.clone(),
            destination_policy,
            broker.clone(),
            scheme.clone(),
            params.clone(),
            client,
        );

        tracing::info!(
            backend = scheme.name(),
            leader = %config.default_leader,
            destination = %config.default_destination,
            timeout_ms = config.request_timeout_ms,
            "Proxy state initialized"
        );

        Ok(Self {
            registry,
            directory,
            broker,
            router,
            params,
            scheme,
            metrics: None,
        })
    }

    /// Proxy with the mock backend and the fixed policies from config
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        Self::new(
            config,
            Arc::new(MockScheme),
            FixedLeader(config.default_leader.clone()),
            Arc::new(FixedDestination(config.default_destination.clone())),
        )
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Shared server state type
pub type SharedState = Arc<ProxyState>;

/// Create shared state from config
pub fn create_shared_state(config: &ProxyConfig) -> Result<SharedState> {
    Ok(Arc::new(ProxyState::from_config(config)?))
}
