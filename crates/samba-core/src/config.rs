//! Proxy configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::defaults;
use crate::error::Error;
use crate::types::InstanceId;

/// Configuration for the SAMBA proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Address the proxy listens on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Leader assigned to every function on first reference
    #[serde(default = "default_leader")]
    pub default_leader: InstanceId,
    /// Instance every message is delivered to
    #[serde(default = "default_destination")]
    pub default_destination: InstanceId,
    /// Deadline for each outbound call (key requests, forwarding)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Cap on requests handled concurrently
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// Hex-encoded public parameters; generated at startup when absent
    #[serde(default)]
    pub params_seed: Option<String>,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_leader() -> InstanceId {
    InstanceId::new(defaults::LEADER)
}

fn default_destination() -> InstanceId {
    InstanceId::new(defaults::DESTINATION)
}

fn default_request_timeout_ms() -> u64 {
    defaults::REQUEST_TIMEOUT_MS
}

fn default_max_concurrent_requests() -> usize {
    defaults::MAX_CONCURRENT_REQUESTS
}

impl ProxyConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.default_leader.is_empty() {
            return Err(Error::InvalidConfig("default_leader is empty".into()));
        }
        if self.default_destination.is_empty() {
            return Err(Error::InvalidConfig("default_destination is empty".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig("request_timeout_ms must be > 0".into()));
        }
        if self.max_concurrent_requests == 0 {
            return Err(Error::InvalidConfig("max_concurrent_requests must be > 0".into()));
        }
        self.params_bytes()?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Decoded `params_seed`
    pub fn params_bytes(&self) -> crate::Result<Option<Vec<u8>>> {
        self.params_seed
            .as_deref()
            .map(|s| {
                hex::decode(s.trim_start_matches("0x"))
                    .map_err(|e| Error::InvalidConfig(format!("params_seed: {}", e)))
            })
            .transpose()
    }

    pub fn with_leader(mut self, leader: impl Into<InstanceId>) -> Self {
        self.default_leader = leader.into();
        self
    }

    pub fn with_destination(mut self, destination: impl Into<InstanceId>) -> Self {
        self.default_destination = destination.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            default_leader: default_leader(),
            default_destination: default_destination(),
            request_timeout_ms: default_request_timeout_ms(),
            max_concurrent_requests: default_max_concurrent_requests(),
            params_seed: None,
        }
    }
}
