//! Error types for samba-core

use thiserror::Error;

use crate::pre::PreError;
use crate::types::{FunctionId, InstanceId};

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid function id: {0} (function id 0 is reserved)")]
    InvalidFunction(FunctionId),

    #[error("No leader available for function {0}")]
    NoLeader(FunctionId),

    #[error("No public key registered for instance {0}")]
    KeyNotFound(InstanceId),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("PRE error: {0}")]
    Pre(#[from] PreError),
}
