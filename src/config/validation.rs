//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{field} is not a valid URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("{field} must include {missing}")]
    IncompleteUrl {
        field: &'static str,
        missing: &'static str,
    },

    #[error("{field} must use http or https, got {scheme:?}")]
    Scheme { field: &'static str, scheme: String },

    #[error("{field} is not a valid address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Check every field of `config`, collecting all problems found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.listener.socket_addr() {
        errors.push(e);
    }
    if let Err(e) = config.backend.host_port() {
        errors.push(e);
    }
    if let Err(e) = config.notifier.endpoint_url() {
        errors.push(e);
    }
    if let Err(e) = config.observability.metrics_socket_addr() {
        errors.push(e);
    }

    let positive = [
        ("listener.backlog", config.listener.backlog as u64),
        ("backend.connect_timeout_ms", config.backend.connect_timeout_ms),
        ("notifier.timeout_ms", config.notifier.timeout_ms),
        ("notifier.workers", config.notifier.workers as u64),
        ("notifier.queue_capacity", config.notifier.queue_capacity as u64),
        ("relay.chunk_size", config.relay.chunk_size as u64),
        ("relay.poll_timeout_ms", config.relay.poll_timeout_ms),
    ];
    errors.extend(
        positive
            .into_iter()
            .filter(|(_, value)| *value == 0)
            .map(|(field, _)| ValidationError::Zero(field)),
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.listener.port = Some(10001);
        config.backend.target = "http://127.0.0.1:10000".into();
        config.notifier.endpoint = "http://127.0.0.1:9000/events".into();
        config
    }

    #[test]
    fn complete_config_is_valid() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn reports_every_missing_value() {
        let errors = validate_config(&ProxyConfig::default()).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::Missing("listener.port"),
                ValidationError::Missing("backend.target"),
                ValidationError::Missing("notifier.endpoint"),
            ]
        );
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let mut config = valid();
        config.notifier.endpoint = "ftp://sink/events".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::Scheme { .. }));
    }

    #[test]
    fn rejects_zero_sizes() {
        let mut config = valid();
        config.notifier.workers = 0;
        config.relay.chunk_size = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::Zero("notifier.workers"),
                ValidationError::Zero("relay.chunk_size"),
            ]
        );
    }

    #[test]
    fn rejects_bad_metrics_address() {
        let mut config = valid();
        config.observability.metrics_address = Some("not-an-address".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidAddress { .. }));
    }
}
