//! Message routing: leader -> destination -> (re-encrypt) -> forward

use std::sync::Arc;

use samba_core::pre::PreScheme;
use samba_core::{DestinationSelectionPolicy, InstanceId, LeaderDirectory, PublicParamsProvider, SambaMessage};

use crate::broker::ReEncryptionBroker;
use crate::client::{Forwarded, InstanceClient};
use crate::error::{Result, ServerError};
use crate::metrics;

/// The final message and where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePlan {
    pub leader: InstanceId,
    pub destination: InstanceId,
    pub message: SambaMessage,
}

impl RoutePlan {
    pub fn re_encrypted(&self) -> bool {
        self.destination != self.leader
    }
}

/// Orchestrates one message through the proxy
///
/// The final message is computed completely before anything is sent, so a
/// failure at any step leaves nothing forwarded.
pub struct MessageRouter {
    directory: Arc<LeaderDirectory>,
    selector: Arc<dyn DestinationSelectionPolicy>,
    broker: Arc<ReEncryptionBroker>,
    scheme: Arc<dyn PreScheme>,
    params: Arc<PublicParamsProvider>,
    client: InstanceClient,
}

impl MessageRouter {
    pub fn new(
        directory: Arc<LeaderDirectory>,
        selector: Arc<dyn DestinationSelectionPolicy>,
        broker: Arc<ReEncryptionBroker>,
        scheme: Arc<dyn PreScheme>,
        params: Arc<PublicParamsProvider>,
        client: InstanceClient,
    ) -> Self {
        Self {
            directory,
            selector,
            broker,
            scheme,
            params,
            client,
        }
    }

    /// Resolve leader and destination and build the message to forward
    pub async fn prepare(&self, message: SambaMessage) -> Result<RoutePlan> {
        let function = message.target.validate()?;
        let leader = self.directory.get_or_assign_leader(function)?;
        let destination = self.selector.select_destination(function);

        if destination == leader {
            tracing::debug!(function = %function, leader = %leader, "Destination is leader, forwarding unchanged");
            return Ok(RoutePlan {
                leader,
                destination,
                message,
            });
        }

        let wrapped_key = message.direct_key().map_err(|e| match e {
            samba_core::Error::Pre(e) => ServerError::InvalidMessage(e.to_string()),
            other => other.into(),
        })?;
        let rk = self.broker.get_re_encryption_key(&leader, &destination).await?;
        let re_encrypted = self
            .scheme
            .re_encrypt(self.params.get_params(), &rk, &wrapped_key)
            .map_err(|e| ServerError::ReEncryption(e.to_string()))?;

        tracing::debug!(
            function = %function,
            leader = %leader,
            destination = %destination,
            "Wrapped key re-encrypted"
        );

        Ok(RoutePlan {
            leader,
            destination,
            message: message.into_re_encrypted(&re_encrypted),
        })
    }

    /// Route a message and relay the destination's response
    pub async fn route(&self, message: SambaMessage) -> Result<Forwarded> {
        let plan = self.prepare(message).await?;

        metrics::record_route_path(if plan.re_encrypted() {
            metrics::PATH_RE_ENCRYPTED
        } else {
            metrics::PATH_DIRECT
        });

        let forwarded = self.client.deliver_message(&plan.destination, &plan.message).await?;
        tracing::info!(
            function = %plan.message.target,
            destination = %plan.destination,
            re_encrypted = plan.re_encrypted(),
            status = forwarded.status,
            "Message forwarded"
        );
        Ok(forwarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use samba_core::pre::{MockScheme, ReEncryptionKey};
    use samba_core::{FixedDestination, FixedLeader, FunctionId, IssuedKey, KeyRegistry};

    const ALICE: &str = "http://alice";
    const BOB: &str = "http://bob";

    struct Fixture {
        scheme: Arc<MockScheme>,
        params: Arc<PublicParamsProvider>,
        registry: Arc<KeyRegistry>,
        router: MessageRouter,
    }

    fn fixture(destination: &str) -> Fixture {
        fixture_with_leader(ALICE, destination)
    }

    fn fixture_with_leader(leader: &str, destination: &str) -> Fixture {
        let scheme = Arc::new(MockScheme);
        let params = Arc::new(PublicParamsProvider::generate(scheme.as_ref()));
        let registry = Arc::new(KeyRegistry::new());
        let client = InstanceClient::new(Duration::from_millis(200)).unwrap();
        let broker = Arc::new(ReEncryptionBroker::new(registry.clone(), client.clone()));
        let router = MessageRouter::new(
            Arc::new(LeaderDirectory::new(FixedLeader(InstanceId::new(leader)))),
            Arc::new(FixedDestination(InstanceId::new(destination))),
            broker,
            scheme.clone(),
            params.clone(),
            client,
        );
        Fixture {
            scheme,
            params,
            registry,
            router,
        }
    }

    #[tokio::test]
    async fn test_destination_is_leader_forwards_unchanged() {
        let fx = fixture(ALICE);
        let pp = fx.params.get_params();
        let alice = fx.scheme.generate_keypair(pp).unwrap();
        let ct1 = fx.scheme.encrypt(pp, &alice.public, &[7u8; 32]).unwrap();
        let message = SambaMessage::direct(FunctionId::new(5), &ct1, b"payload".to_vec());

        let plan = fx.router.prepare(message.clone()).await.unwrap();

        assert_eq!(plan.message, message);
        assert!(!plan.message.is_re_encrypted());
        assert!(!plan.re_encrypted());
        assert_eq!(plan.destination, InstanceId::new(ALICE));
    }

    #[tokio::test]
    async fn test_destination_differs_re_encrypts() {
        let fx = fixture(BOB);
        let pp = fx.params.get_params();
        let alice = fx.scheme.generate_keypair(pp).unwrap();
        let bob = fx.scheme.generate_keypair(pp).unwrap();
        let rk = fx.scheme.re_encryption_key(pp, &alice.secret, &bob.public).unwrap();
        fx.registry.set_re_encryption_key(
            &InstanceId::new(BOB),
            IssuedKey {
                leader: InstanceId::new(ALICE),
                key: rk,
            },
        );

        let symmetric_key = [9u8; 32];
        let ct1 = fx.scheme.encrypt(pp, &alice.public, &symmetric_key).unwrap();
        let payload = vec![0u8, 1, 2, 255];
        let message = SambaMessage::direct(FunctionId::new(5), &ct1, payload.clone());

        let plan = fx.router.prepare(message).await.unwrap();

        assert!(plan.re_encrypted());
        assert!(plan.message.is_re_encrypted());
        assert!(plan.message.direct_key().is_err());
        assert_eq!(plan.message.ciphertext, payload);
        let ct2 = plan.message.re_encrypted_key().unwrap();
        assert_eq!(
            fx.scheme.decrypt_re_encrypted(pp, &bob.secret, &ct2).unwrap(),
            symmetric_key
        );
    }

    #[tokio::test]
    async fn test_zero_target_rejected() {
        let fx = fixture(BOB);
        let message = SambaMessage::direct(
            FunctionId::new(0),
            &samba_core::pre::Ciphertext1::new(vec![1; 32]),
            Vec::new(),
        );
        let err = fx.router.route(message).await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidFunction(_)));
    }

    #[tokio::test]
    async fn test_broker_failure_aborts_route() {
        // Bob has no public key and no cached key: nothing can be forwarded
        let fx = fixture(BOB);
        let message = SambaMessage::direct(
            FunctionId::new(5),
            &samba_core::pre::Ciphertext1::new(vec![1; 32]),
            Vec::new(),
        );
        let err = fx.router.route(message).await.unwrap_err();
        assert!(matches!(err, ServerError::KeyNotFound(_)));
    }

    #[tokio::test]
    async fn test_already_re_encrypted_input_rejected() {
        let fx = fixture(BOB);
        fx.registry.set_re_encryption_key(
            &InstanceId::new(BOB),
            IssuedKey {
                leader: InstanceId::new(ALICE),
                key: ReEncryptionKey::new(vec![0; 64]),
            },
        );
        let message = SambaMessage::direct(
            FunctionId::new(5),
            &samba_core::pre::Ciphertext1::new(vec![1; 32]),
            Vec::new(),
        )
        .into_re_encrypted(&samba_core::pre::Ciphertext2::new(vec![2; 32]));

        let err = fx.router.prepare(message).await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidMessage(_)));
    }

    #[tokio::test]
    async fn test_unreachable_destination_is_forward_error() {
        let fx = fixture_with_leader("http://127.0.0.1:1", "http://127.0.0.1:1");
        let message = SambaMessage::direct(
            FunctionId::new(5),
            &samba_core::pre::Ciphertext1::new(vec![1; 32]),
            Vec::new(),
        );
        let err = fx.router.route(message).await.unwrap_err();
        assert!(matches!(err, ServerError::RemoteForward { status: None, .. }));
    }

    #[tokio::test]
    async fn test_empty_wrapped_key_is_invalid_message() {
        let fx = fixture(BOB);
        let message = SambaMessage::direct(
            FunctionId::new(5),
            &samba_core::pre::Ciphertext1::new(Vec::new()),
            Vec::new(),
        );
        let err = fx.router.prepare(message).await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidMessage(_)));
    }
}
