//! A function instance: owns a PRE key pair and serves the proxy's callbacks

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use samba_core::pre::{KeyPair, PreScheme, PublicKey, PublicParams};
use samba_core::{
    FunctionId, InstanceId, ReEncryptionKeyMessage, ReEncryptionKeyRequest, SambaMessage,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::error::Result;

/// What an instance answers after receiving a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub instance_id: InstanceId,
    pub was_re_encrypted: bool,
    /// The unwrapped symmetric key
    #[serde(with = "hex")]
    pub wrapped_key: Vec<u8>,
    /// The payload exactly as received
    #[serde(with = "hex")]
    pub ciphertext: Vec<u8>,
}

type Rejection = (StatusCode, String);

/// An instance with its key material
pub struct InstanceNode {
    id: InstanceId,
    scheme: Arc<dyn PreScheme>,
    params: PublicParams,
    keys: KeyPair,
    key_requests: AtomicU64,
    messages: AtomicU64,
}

impl InstanceNode {
    /// Create a node with a freshly generated key pair
    pub fn new(id: InstanceId, scheme: Arc<dyn PreScheme>, params: PublicParams) -> Result<Self> {
        let keys = scheme.generate_keypair(&params)?;
        Ok(Self {
            id,
            scheme,
            params,
            keys,
            key_requests: AtomicU64::new(0),
            messages: AtomicU64::new(0),
        })
    }

    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.keys.public
    }

    /// Re-encryption key requests served so far
    pub fn key_requests(&self) -> u64 {
        self.key_requests.load(Ordering::Relaxed)
    }

    /// Messages received so far
    pub fn messages(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    /// Build a message for `target` whose symmetric key is wrapped under the leader's key
    pub fn seal(
        &self,
        target: FunctionId,
        leader_public_key: &PublicKey,
        symmetric_key: &[u8],
        ciphertext: Vec<u8>,
    ) -> Result<SambaMessage> {
        let wrapped = self.scheme.encrypt(&self.params, leader_public_key, symmetric_key)?;
        Ok(SambaMessage::direct(target, &wrapped, ciphertext))
    }

    /// Derive the re-encryption key from this node towards the requester
    pub fn issue_re_encryption_key(&self, request: &ReEncryptionKeyRequest) -> Result<ReEncryptionKeyMessage> {
        let to_public = PublicKey::from_serialized(&request.public_key_serialized)?;
        self.scheme.check_public_key(&self.params, &to_public)?;
        let rk = self
            .scheme
            .re_encryption_key(&self.params, &self.keys.secret, &to_public)?;

        self.key_requests.fetch_add(1, Ordering::Relaxed);
        tracing::info!(leader = %self.id, beneficiary = %request.instance_id, "Issued re-encryption key");

        Ok(ReEncryptionKeyMessage {
            instance_id: request.instance_id.clone(),
            re_encryption_key_serialized: rk.serialize(),
        })
    }

    /// Unwrap a received message's symmetric key
    pub fn open(&self, message: &SambaMessage) -> Result<DeliveryReceipt> {
        let symmetric_key = if message.is_re_encrypted() {
            let ct = message.re_encrypted_key()?;
            self.scheme
                .decrypt_re_encrypted(&self.params, &self.keys.secret, &ct)?
        } else {
            let ct = message.direct_key()?;
            self.scheme.decrypt(&self.params, &self.keys.secret, &ct)?
        };

        self.messages.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            instance = %self.id,
            function = %message.target,
            re_encrypted = message.is_re_encrypted(),
            "Message received"
        );

        Ok(DeliveryReceipt {
            instance_id: self.id.clone(),
            was_re_encrypted: message.is_re_encrypted(),
            wrapped_key: symmetric_key,
            ciphertext: message.ciphertext.clone(),
        })
    }

    /// Endpoints the proxy calls on this instance
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/requestReEncryptionKey", post(request_re_encryption_key))
            .route("/message", post(receive_message))
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }
}

async fn request_re_encryption_key(
    State(node): State<Arc<InstanceNode>>,
    body: Bytes,
) -> std::result::Result<Json<ReEncryptionKeyMessage>, Rejection> {
    let request: ReEncryptionKeyRequest = serde_json::from_slice(&body)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid key request: {}", e)))?;
    node.issue_re_encryption_key(&request)
        .map(Json)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

async fn receive_message(
    State(node): State<Arc<InstanceNode>>,
    body: Bytes,
) -> std::result::Result<Json<DeliveryReceipt>, Rejection> {
    let message: SambaMessage = serde_json::from_slice(&body)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid message: {}", e)))?;
    node.open(&message).map(Json).map_err(|e| {
        tracing::warn!(instance = %node.id, error = %e, "Could not open message");
        (StatusCode::BAD_REQUEST, e.to_string())
    })
}
