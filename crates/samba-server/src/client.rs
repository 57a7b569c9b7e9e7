//! Outbound calls from the proxy to instances

use std::time::Duration;

use axum::body::Bytes;
use reqwest::Client;
use samba_core::{InstanceId, ReEncryptionKeyMessage, ReEncryptionKeyRequest, SambaMessage};

use crate::error::{Result, ServerError};

/// A destination's response, relayed to the caller untouched
#[derive(Debug, Clone)]
pub struct Forwarded {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// HTTP client for the collaborator-facing calls
///
/// Every request carries the configured deadline; an elapsed deadline is
/// reported like any other transport failure.
#[derive(Clone)]
pub struct InstanceClient {
    http: Client,
    timeout: Duration,
}

impl InstanceClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServerError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, timeout })
    }

    /// `POST <leader>/requestReEncryptionKey`
    pub async fn request_re_encryption_key(
        &self,
        leader: &InstanceId,
        request: &ReEncryptionKeyRequest,
    ) -> Result<ReEncryptionKeyMessage> {
        let remote_error = |status: Option<u16>, message: String| ServerError::RemoteKeyRequest {
            leader: leader.clone(),
            status,
            message,
        };

        let resp = self
            .http
            .post(leader.endpoint("requestReEncryptionKey"))
            .json(request)
            .send()
            .await
            .map_err(|e| remote_error(None, describe(&e, self.timeout)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(remote_error(Some(status.as_u16()), body));
        }

        resp.json::<ReEncryptionKeyMessage>()
            .await
            .map_err(|e| remote_error(Some(status.as_u16()), format!("malformed response: {}", e)))
    }

    /// `POST <destination>/message`
    pub async fn deliver_message(&self, destination: &InstanceId, message: &SambaMessage) -> Result<Forwarded> {
        let remote_error = |message: String| ServerError::RemoteForward {
            destination: destination.clone(),
            status: None,
            message,
        };

        let resp = self
            .http
            .post(destination.endpoint("message"))
            .json(message)
            .send()
            .await
            .map_err(|e| remote_error(describe(&e, self.timeout)))?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .bytes()
            .await
            .map_err(|e| remote_error(describe(&e, self.timeout)))?;

        Ok(Forwarded {
            status,
            content_type,
            body,
        })
    }
}

fn describe(err: &reqwest::Error, timeout: Duration) -> String {
    if err.is_timeout() {
        format!("deadline of {:?} exceeded", timeout)
    } else {
        err.to_string()
    }
}
