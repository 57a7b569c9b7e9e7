//! Re-encryption key acquisition and caching

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use samba_core::pre::ReEncryptionKey;
use samba_core::{InstanceId, IssuedKey, KeyRegistry, ReEncryptionKeyRequest};
use tokio::sync::Mutex;

use crate::client::InstanceClient;
use crate::error::{Result, ServerError};
use crate::metrics;

type Pair = (InstanceId, InstanceId);

/// Obtains re-encryption keys from leaders and caches them in the registry
///
/// A key is fetched at most once per (leader, target) pair: concurrent
/// callers for the same pair wait on one in-flight request and then read the
/// cached result. Failures are not retried here.
pub struct ReEncryptionBroker {
    registry: Arc<KeyRegistry>,
    client: InstanceClient,
    inflight: Mutex<HashMap<Pair, Arc<Mutex<()>>>>,
    remote_requests: AtomicU64,
}

impl ReEncryptionBroker {
    pub fn new(registry: Arc<KeyRegistry>, client: InstanceClient) -> Self {
        Self {
            registry,
            client,
            inflight: Mutex::new(HashMap::new()),
            remote_requests: AtomicU64::new(0),
        }
    }

    /// Re-encryption key `leader -> target`, from cache or from the leader
    pub async fn get_re_encryption_key(&self, leader: &InstanceId, target: &InstanceId) -> Result<ReEncryptionKey> {
        if let Some(key) = self.registry.re_encryption_key_from(target, leader) {
            metrics::record_rekey_cache_hit();
            return Ok(key);
        }

        let pair = (leader.clone(), target.clone());
        let slot = self.inflight.lock().await.entry(pair.clone()).or_default().clone();
        let _guard = slot.lock().await;

        // Another caller may have fetched it while we waited
        if let Some(key) = self.registry.re_encryption_key_from(target, leader) {
            metrics::record_rekey_cache_hit();
            return Ok(key);
        }

        let result = self.fetch(leader, target).await;
        self.inflight.lock().await.remove(&pair);
        result
    }

    /// Number of key requests actually sent to leaders
    pub fn remote_requests(&self) -> u64 {
        self.remote_requests.load(Ordering::Relaxed)
    }

    async fn fetch(&self, leader: &InstanceId, target: &InstanceId) -> Result<ReEncryptionKey> {
        let public_key = self
            .registry
            .public_key(target)
            .ok_or_else(|| ServerError::KeyNotFound(target.clone()))?;

        let request = ReEncryptionKeyRequest {
            instance_id: target.clone(),
            public_key_serialized: public_key.serialize(),
        };

        tracing::info!(leader = %leader, target = %target, "Requesting re-encryption key");
        self.remote_requests.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        let response = match self.client.request_re_encryption_key(leader, &request).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_rekey_request(metrics::OUTCOME_SERVER_ERROR, start.elapsed());
                return Err(e);
            }
        };

        let key = ReEncryptionKey::from_serialized(&response.re_encryption_key_serialized).map_err(|e| {
            metrics::record_rekey_request(metrics::OUTCOME_SERVER_ERROR, start.elapsed());
            ServerError::RemoteKeyRequest {
                leader: leader.clone(),
                status: None,
                message: format!("malformed re-encryption key: {}", e),
            }
        })?;

        if &response.instance_id != target {
            tracing::warn!(
                leader = %leader,
                requested = %target,
                beneficiary = %response.instance_id,
                "Leader issued re-encryption key for a different instance"
            );
        }

        self.registry.set_re_encryption_key(
            &response.instance_id,
            IssuedKey {
                leader: leader.clone(),
                key: key.clone(),
            },
        );
        metrics::record_rekey_request(metrics::OUTCOME_OK, start.elapsed());
        tracing::info!(leader = %leader, instance = %response.instance_id, "Re-encryption key cached");

        Ok(key)
    }
}
