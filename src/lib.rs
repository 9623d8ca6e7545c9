//! Transparent TCP proxy that reconstructs the HTTP exchanges it relays and
//! reports them to a webhook.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod notify;
pub mod observability;
pub mod transform;

pub use config::schema::ProxyConfig;
pub use lifecycle::Shutdown;
pub use net::Multiplexer;
