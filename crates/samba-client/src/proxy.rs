//! HTTP client for the proxy's caller-facing endpoints

use reqwest::{Client, Response};
use samba_core::pre::{PublicKey, PublicKeySerialized, PublicParams, PublicParamsSerialized};
use samba_core::{FunctionId, InstanceId, SambaMessage};

use crate::error::{ClientError, Result};

/// What the proxy answered to `POST /message`
///
/// On success this is the destination's response relayed verbatim, so the
/// status is not interpreted here.
#[derive(Debug, Clone)]
pub struct MessageReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl MessageReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Typed access to a running proxy
#[derive(Clone)]
pub struct ProxyClient {
    http: Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// `GET /publicParams`
    pub async fn public_params(&self) -> Result<PublicParams> {
        let resp = check(self.http.get(self.url("publicParams")).send().await?).await?;
        let wire: PublicParamsSerialized = resp.json().await?;
        Ok(PublicParams::from_serialized(&wire)?)
    }

    /// `POST /registerPublicKey?instanceId=<instance>`
    pub async fn register_public_key(&self, instance: &InstanceId, public_key: &PublicKey) -> Result<()> {
        let resp = self
            .http
            .post(self.url("registerPublicKey"))
            .query(&[("instanceId", instance.as_str())])
            .json(&public_key.serialize())
            .send()
            .await?;
        check(resp).await?;
        tracing::debug!(instance = %instance, "Registered public key");
        Ok(())
    }

    /// `GET /publicKey?functionId=<function>`: the public key of the function's leader
    pub async fn leader_public_key(&self, function: FunctionId) -> Result<PublicKey> {
        let resp = self
            .http
            .get(self.url("publicKey"))
            .query(&[("functionId", function.get())])
            .send()
            .await?;
        let wire: PublicKeySerialized = check(resp).await?.json().await?;
        Ok(PublicKey::from_serialized(&wire)?)
    }

    /// `POST /message`
    pub async fn send_message(&self, message: &SambaMessage) -> Result<MessageReply> {
        let resp = self.http.post(self.url("message")).json(message).send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        Ok(MessageReply { status, body })
    }
}

async fn check(resp: Response) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    Err(ClientError::Server {
        status: resp.status().as_u16(),
        message: resp.text().await.unwrap_or_default(),
    })
}
