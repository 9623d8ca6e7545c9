//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::validation::ValidationError;

/// Root configuration for the notification proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listen socket settings.
    pub listener: ListenerConfig,

    /// The single backend every client is forwarded to.
    pub backend: BackendConfig,

    /// Webhook delivery settings.
    pub notifier: NotifierConfig,

    /// Relay loop tuning.
    pub relay: RelayConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (all interfaces by default).
    pub bind_address: String,

    /// Port to listen on. Required; `0` picks an ephemeral port.
    pub port: Option<u16>,

    /// Pending connection backlog.
    pub backlog: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: None,
            backlog: 200,
        }
    }
}

impl ListenerConfig {
    /// Resolve `bind_address` and `port` into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ValidationError> {
        let port = self.port.ok_or(ValidationError::Missing("listener.port"))?;
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|_| ValidationError::InvalidAddress {
                field: "listener.bind_address",
                value: self.bind_address.clone(),
            })?;
        Ok(SocketAddr::new(ip, port))
    }
}

/// Backend target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend URL, e.g. `http://127.0.0.1:10000`. Only host and port are used.
    pub target: String,

    /// Timeout for opening the backend connection of a new pair.
    pub connect_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            connect_timeout_ms: 5_000,
        }
    }
}

impl BackendConfig {
    /// Host and port of the backend target.
    pub fn host_port(&self) -> Result<(String, u16), ValidationError> {
        let url = parse_url("backend.target", &self.target)?;
        let host = url
            .host_str()
            .ok_or(ValidationError::IncompleteUrl {
                field: "backend.target",
                missing: "a host",
            })?
            .to_string();
        let port = url.port_or_known_default().ok_or(ValidationError::IncompleteUrl {
            field: "backend.target",
            missing: "a port",
        })?;
        Ok((host, port))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Notification sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Webhook URL receiving the JSON payloads.
    pub endpoint: String,

    /// Timeout of a single delivery attempt.
    pub timeout_ms: u64,

    /// Number of delivery workers.
    pub workers: usize,

    /// Payloads waiting for a worker before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_ms: 1_000,
            workers: 4,
            queue_capacity: 1_024,
        }
    }
}

impl NotifierConfig {
    /// Parsed webhook URL; only `http` and `https` are accepted.
    pub fn endpoint_url(&self) -> Result<Url, ValidationError> {
        let url = parse_url("notifier.endpoint", &self.endpoint)?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ValidationError::Scheme {
                field: "notifier.endpoint",
                scheme: other.to_string(),
            }),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// How the relay decides that a chunk carries responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ResponseDetection {
    /// A chunk starting with `HTTP/1.1` is a response, whichever socket it came from.
    #[default]
    Sniff,
    /// Every read from the backend-facing socket is a response.
    BackendRole,
}

/// Relay loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Maximum bytes read from a socket per readiness event.
    pub chunk_size: usize,

    /// Upper bound of one readiness wait.
    pub poll_timeout_ms: u64,

    /// Fixed pause after each loop iteration.
    pub poll_delay_ms: u64,

    pub response_detection: ResponseDetection,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4_096,
            poll_timeout_ms: 100,
            poll_delay_ms: 1,
            response_detection: ResponseDetection::Sniff,
        }
    }
}

impl RelayConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Prometheus scrape address; metrics are not exported when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "notify_proxy=info".to_string(),
            metrics_address: None,
        }
    }
}

impl ObservabilityConfig {
    pub fn metrics_socket_addr(&self) -> Result<Option<SocketAddr>, ValidationError> {
        self.metrics_address
            .as_deref()
            .map(|value| {
                value.parse().map_err(|_| ValidationError::InvalidAddress {
                    field: "observability.metrics_address",
                    value: value.to_string(),
                })
            })
            .transpose()
    }
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Url::parse(value).map_err(|e| ValidationError::InvalidUrl {
        field,
        reason: e.to_string(),
    })
}
