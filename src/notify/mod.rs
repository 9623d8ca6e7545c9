//! Notification delivery subsystem.
//!
//! # Data Flow
//! ```text
//! relay loop
//!     → dispatcher.rs (try_send into a bounded queue, never awaits)
//!     → worker pool (fixed number of tasks)
//!     → Notifier::notify (webhook.rs posts JSON with a short timeout)
//! ```
//!
//! # Design Decisions
//! - Best effort: a full queue drops the payload, failures are only logged
//! - No ordering between payloads handled by different workers
//! - Workers share nothing with the relay loop except the payload they receive

pub mod dispatcher;
pub mod webhook;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use webhook::WebhookNotifier;

/// Errors raised while delivering one payload.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Transport failure or timeout.
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The sink answered with a non-success status.
    #[error("notification endpoint returned status {0}")]
    Status(u16),

    /// Failure reported by a non-HTTP sink.
    #[error("notification sink failed: {0}")]
    Sink(String),
}

/// Delivers one JSON payload to an external sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, payload: &Value) -> Result<(), NotifyError>;
}
