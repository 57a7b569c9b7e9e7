//! samba-core: key management and routing primitives for the SAMBA proxy
//!
//! The proxy sits between callers and a set of compute instances that share
//! data under a proxy re-encryption (PRE) scheme:
//! - Each logical function has one leader instance holding the master key pair
//! - Other instances need a re-encryption key (leader -> instance) before the
//!   proxy can transform leader-encrypted wrapped keys for them
//!
//! # Trust Model
//!
//! | Party | Learns plaintext | Holds secret keys |
//! |-------|------------------|-------------------|
//! | Proxy | NO | NO (only public keys and re-encryption keys) |
//! | Leader | YES | its own |
//! | Destination | YES (after re-encryption) | its own |
//!
//! The message payload (`ciphertext`) is symmetric ciphertext under a key that
//! is itself wrapped with PRE. The proxy only ever touches the wrapped key.

mod config;
mod error;
mod leader;
mod message;
mod params;
mod registry;
mod selector;
mod types;

pub mod pre;

pub use config::ProxyConfig;
pub use error::Error;
pub use leader::{FixedLeader, LeaderDirectory, LeaderSelectionPolicy};
pub use message::{ReEncryptionKeyMessage, ReEncryptionKeyRequest, SambaMessage, WrappedKey};
pub use params::PublicParamsProvider;
pub use registry::{InstanceKeys, IssuedKey, KeyRegistry};
pub use selector::{DestinationSelectionPolicy, FixedDestination};
pub use types::{FunctionId, InstanceId};

pub type Result<T> = std::result::Result<T, Error>;

/// Well-known instance addresses used by the default policies
pub mod defaults {
    /// Default leader for every function
    pub const LEADER: &str = "http://localhost:8081";

    /// Default destination for every message
    pub const DESTINATION: &str = "http://localhost:8082";

    /// Default deadline for outbound calls, in milliseconds
    pub const REQUEST_TIMEOUT_MS: u64 = 30_000;

    /// Default cap on concurrently handled requests
    pub const MAX_CONCURRENT_REQUESTS: usize = 1024;
}
