//! Transform capability: correlated exchanges → notification events.
//!
//! # Data Flow
//! ```text
//! Vec<Exchange> (one correlation pass)
//!     → Transform::transform (injected at construction)
//!     → Vec<serde_json::Value> (opaque events)
//!     → notify::Dispatcher
//! ```
//!
//! # Design Decisions
//! - Transforms are values handed to the multiplexer, never looked up by name
//!   at runtime; the CLI maps a name to a constructor once at startup
//! - A transform error is fatal to the pair that produced the exchanges
//! - Without a transform the exchanges themselves are the payload

pub mod event_grid;
pub mod sample;

use serde_json::Value;
use thiserror::Error;

use crate::http::Exchange;

pub use event_grid::{EventGridTransform, BLOB_CREATED};
pub use sample::SampleTransform;

/// Errors raised by a transform.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The request path does not have the segments the transform needs.
    #[error("request path {path:?} has fewer than {expected} segments")]
    PathSegments { path: String, expected: usize },

    /// Any other transform-specific failure.
    #[error("transform failed: {0}")]
    Other(String),
}

/// Maps the exchanges of one correlation pass to output events.
pub trait Transform: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        "custom"
    }

    fn transform(&self, exchanges: &[Exchange]) -> Result<Vec<Value>, TransformError>;
}

impl<F> Transform for F
where
    F: Fn(&[Exchange]) -> Result<Vec<Value>, TransformError> + Send + Sync,
{
    fn transform(&self, exchanges: &[Exchange]) -> Result<Vec<Value>, TransformError> {
        self(exchanges)
    }
}

/// Built-in transforms selectable by name on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TransformKind {
    /// Azure Event Grid `BlobCreated` envelopes
    #[value(alias = "azurite-to-azure-event-grid")]
    EventGrid,
    /// `{endpoint, container_name, path}` summaries
    Sample,
}

impl TransformKind {
    /// Construct the transform. `proxy_port` is the port clients reach the proxy on.
    pub fn build(self, proxy_port: u16) -> Box<dyn Transform> {
        match self {
            TransformKind::EventGrid => Box::new(EventGridTransform::new(proxy_port)),
            TransformKind::Sample => Box::new(SampleTransform),
        }
    }
}

/// Whether an exchange is a successful blob upload (`PUT` answered by `201`).
pub(crate) fn is_blob_created(exchange: &Exchange) -> bool {
    exchange.request.method == "PUT" && exchange.response.status_code == 201
}

/// Request path with surrounding slashes removed.
pub(crate) fn trimmed_path(path: &str) -> &str {
    path.trim_matches('/')
}

/// Drop everything from the first `?`.
pub(crate) fn without_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(path, _)| path)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::http::{Exchange, Headers, ParsedRequest, ParsedResponse};

    pub fn exchange(method: &str, path: &str, status_code: u16) -> Exchange {
        Exchange {
            request: ParsedRequest {
                method: method.to_string(),
                path: path.to_string(),
                headers: Headers::new(),
                body: String::new(),
            },
            response: ParsedResponse {
                version: "HTTP/1.1".to_string(),
                status_code,
                reason_phrase: String::new(),
                headers: Headers::new(),
                body: String::new(),
            },
        }
    }
}
