//! Client error types

use thiserror::Error;

/// Errors from talking to the proxy or handling instance requests
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error(transparent)]
    Core(#[from] samba_core::Error),

    #[error(transparent)]
    Pre(#[from] samba_core::pre::PreError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
