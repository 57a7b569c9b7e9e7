//! Shared harness: a proxy plus two instances on ephemeral ports
//!
//! Alice is the leader of every function. Bob is the destination unless the
//! cluster is started with the leader as destination.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use reqwest::Client;
use samba_client::{InstanceNode, ProxyClient};
use samba_core::pre::MockScheme;
use samba_core::{InstanceId, ProxyConfig};
use samba_server::{create_router, create_shared_state, SharedState};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub struct Cluster {
    pub proxy_url: String,
    pub proxy: ProxyClient,
    pub state: SharedState,
    pub alice: Arc<InstanceNode>,
    pub bob: Arc<InstanceNode>,
    pub http: Client,
    _shutdown: Vec<oneshot::Sender<()>>,
}

impl Cluster {
    /// Alice leads, Bob receives: messages are re-encrypted
    pub async fn re_encrypting() -> Self {
        Self::start(false).await
    }

    /// Alice leads and receives: messages pass through unchanged
    pub async fn leader_is_destination() -> Self {
        Self::start(true).await
    }

    async fn start(leader_is_destination: bool) -> Self {
        let (alice_listener, alice_id) = bind().await;
        let (bob_listener, bob_id) = bind().await;
        let (proxy_listener, proxy_url) = bind().await;

        let destination = if leader_is_destination {
            alice_id.clone()
        } else {
            bob_id.clone()
        };
        let config = ProxyConfig {
            listen_addr: proxy_listener.local_addr().expect("local addr"),
            request_timeout_ms: 5_000,
            ..ProxyConfig::default()
        }
        .with_leader(alice_id.clone())
        .with_destination(destination);

        let state = create_shared_state(&config).expect("state should build");
        let params = state.params.get_params().clone();

        let alice = Arc::new(
            InstanceNode::new(alice_id, Arc::new(MockScheme), params.clone()).expect("alice keys"),
        );
        let bob =
            Arc::new(InstanceNode::new(bob_id, Arc::new(MockScheme), params).expect("bob keys"));

        let shutdown = vec![
            spawn(proxy_listener, create_router(state.clone(), config.max_concurrent_requests)),
            spawn(alice_listener, alice.clone().router()),
            spawn(bob_listener, bob.clone().router()),
        ];

        Self {
            proxy: ProxyClient::new(proxy_url.as_str()),
            proxy_url: proxy_url.as_str().to_string(),
            state,
            alice,
            bob,
            http: Client::new(),
            _shutdown: shutdown,
        }
    }

    pub async fn register(&self, node: &InstanceNode) {
        self.proxy
            .register_public_key(node.id(), node.public_key())
            .await
            .expect("registration should succeed");
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.proxy_url, path)
    }
}

async fn bind() -> (TcpListener, InstanceId) {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("bind should succeed");
    let addr = listener.local_addr().expect("local addr");
    (listener, InstanceId::new(format!("http://{}", addr)))
}

fn spawn(listener: TcpListener, router: Router) -> oneshot::Sender<()> {
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await
            .ok();
    });
    tx
}
