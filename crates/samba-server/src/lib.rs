//! samba-server: the SAMBA re-encryption proxy
//!
//! Accepts messages for a function, finds the function's leader and the
//! destination instance, re-encrypts the wrapped key when they differ, and
//! relays the destination's response to the caller.

pub mod broker;
pub mod client;
pub mod error;
pub mod metrics;
pub mod router;
pub mod routes;
pub mod server;
pub mod state;

pub use broker::ReEncryptionBroker;
pub use client::{Forwarded, InstanceClient};
pub use error::ServerError;
pub use router::{MessageRouter, RoutePlan};
pub use routes::create_router;
pub use server::{ProxyServer, ServerBuilder};
pub use state::{create_shared_state, ProxyState, SharedState};
