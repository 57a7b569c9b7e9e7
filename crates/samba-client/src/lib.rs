//! Instance side of SAMBA
//!
//! - [`ProxyClient`]: typed calls against a running proxy
//! - [`InstanceNode`]: the endpoints a function instance exposes to the proxy

pub mod error;
pub mod instance;
pub mod proxy;

pub use error::{ClientError, Result};
pub use instance::{DeliveryReceipt, InstanceNode};
pub use proxy::{MessageReply, ProxyClient};
