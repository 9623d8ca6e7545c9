//! Command line and environment surface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::{ProxyConfig, ResponseDetection};
use crate::config::validation::validate_config;
use crate::transform::TransformKind;

#[derive(Debug, Parser)]
#[command(name = "notify-proxy")]
#[command(
    about = "Transparent TCP proxy that turns observed HTTP exchanges into webhook notifications",
    long_about = None
)]
pub struct Cli {
    /// Optional TOML file; command line and environment values override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PROXY_PORT")]
    pub port: Option<u16>,

    /// Backend URL every client is forwarded to
    #[arg(short, long, env = "TARGET_SERVER")]
    pub target: Option<String>,

    /// Webhook receiving the notifications
    #[arg(short = 'n', long, env = "NOTIFICATION_ENDPOINT")]
    pub notification_endpoint: Option<String>,

    /// Address of the Prometheus scrape listener
    #[arg(long)]
    pub metrics_address: Option<String>,

    /// How responses are recognised on a pair
    #[arg(long, value_enum)]
    pub response_detection: Option<ResponseDetection>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Transform applied to correlated exchanges before notifying
    #[arg(value_enum)]
    pub transform: Option<TransformKind>,
}

impl Cli {
    /// Layer flags and environment over the config file (or defaults) and validate.
    pub fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(port) = self.port {
            config.listener.port = Some(port);
        }
        if let Some(target) = self.target {
            config.backend.target = target;
        }
        if let Some(endpoint) = self.notification_endpoint {
            config.notifier.endpoint = endpoint;
        }
        if let Some(addr) = self.metrics_address {
            config.observability.metrics_address = Some(addr);
        }
        if let Some(detection) = self.response_detection {
            config.relay.response_detection = detection;
        }
        if let Some(filter) = self.log_filter {
            config.observability.log_filter = filter;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
