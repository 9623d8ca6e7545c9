//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (flags and PROXY_PORT / TARGET_SERVER / NOTIFICATION_ENDPOINT override)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload
//! - All fields have defaults to allow minimal configs, except the three
//!   required values (listen port, backend target, notification endpoint)
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::{load_config, ConfigError};
pub use schema::{
    BackendConfig, ListenerConfig, NotifierConfig, ObservabilityConfig, ProxyConfig, RelayConfig,
    ResponseDetection,
};
pub use validation::{validate_config, ValidationError};
