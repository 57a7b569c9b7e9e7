//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use samba_core::{FunctionId, InstanceId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    #[error("Missing query parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid function id: {0}")]
    InvalidFunction(FunctionId),

    #[error("Leader lookup failed: {0}")]
    LeaderLookup(String),

    #[error("Function leader has no public key (leader {0})")]
    LeaderHasNoPublicKey(InstanceId),

    #[error("No public key registered for instance {0}")]
    KeyNotFound(InstanceId),

    #[error("Re-encryption key request to {leader} failed{}: {message}", status_suffix(.status))]
    RemoteKeyRequest {
        leader: InstanceId,
        status: Option<u16>,
        message: String,
    },

    #[error("Message forwarding to {destination} failed{}: {message}", status_suffix(.status))]
    RemoteForward {
        destination: InstanceId,
        status: Option<u16>,
        message: String,
    },

    #[error("Re-encryption failed: {0}")]
    ReEncryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {}", s)).unwrap_or_default()
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidMessage(_)
            | ServerError::InvalidKey(_)
            | ServerError::MissingParameter(_)
            | ServerError::InvalidFunction(_) => StatusCode::BAD_REQUEST,
            ServerError::LeaderLookup(_)
            | ServerError::LeaderHasNoPublicKey(_)
            | ServerError::KeyNotFound(_)
            | ServerError::RemoteKeyRequest { .. }
            | ServerError::RemoteForward { .. }
            | ServerError::ReEncryption(_)
            | ServerError::Io(_)
            | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<samba_core::Error> for ServerError {
    fn from(err: samba_core::Error) -> Self {
        match err {
            samba_core::Error::InvalidFunction(function) => ServerError::InvalidFunction(function),
            samba_core::Error::NoLeader(function) => {
                ServerError::LeaderLookup(format!("no leader available for function {}", function))
            }
            samba_core::Error::KeyNotFound(instance) => ServerError::KeyNotFound(instance),
            samba_core::Error::InvalidMessage(msg) => ServerError::InvalidMessage(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let message = match &self {
            // Callers match on this exact body
            ServerError::InvalidMessage(_) => "Invalid message format".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
