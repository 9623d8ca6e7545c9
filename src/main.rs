//! notify-proxy
//!
//! A transparent TCP forwarding proxy that sits between a client and a backend
//! HTTP server, relays every byte unmodified, and reports the HTTP exchanges it
//! sees to a webhook.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                  NOTIFY PROXY                    │
//!     Client bytes       │  ┌──────────┐        ┌──────────────┐            │
//!     ───────────────────┼─▶│ listener │───────▶│  multiplexer │────────────┼──▶ Backend
//!     ◀──────────────────┼──│          │◀───────│ (relay loop) │◀───────────┼─── Server
//!                        │  └──────────┘        └──────┬───────┘            │
//!                        │                             │ response chunk     │
//!                        │                             ▼                    │
//!                        │   ┌──────────┐   ┌────────────┐   ┌───────────┐  │
//!                        │   │ splitter │──▶│ correlator │──▶│ transform │  │
//!                        │   └──────────┘   └────────────┘   └─────┬─────┘  │
//!                        │                                         ▼        │
//!                        │                                  ┌────────────┐  │
//!                        │                                  │ dispatcher │──┼──▶ Webhook
//!                        │                                  │ (workers)  │  │
//!                        │                                  └────────────┘  │
//!                        └──────────────────────────────────────────────────┘
//! ```
//!
//! # Configuration
//! - `PROXY_PORT` / `--port`: listen port
//! - `TARGET_SERVER` / `--target`: backend URL
//! - `NOTIFICATION_ENDPOINT` / `--notification-endpoint`: webhook URL
//! - optional positional transform name (`event-grid`, `sample`)

use std::sync::Arc;

use clap::Parser;

use notify_proxy::config::Cli;
use notify_proxy::lifecycle::{wait_for_shutdown_signal, Shutdown};
use notify_proxy::net::{BackendTarget, Listener, Multiplexer};
use notify_proxy::notify::{Dispatcher, WebhookNotifier};
use notify_proxy::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let transform_kind = cli.transform;
    let config = cli.into_config()?;

    logging::init_logging(&config.observability.log_filter)?;
    tracing::info!("notify-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = config.observability.metrics_socket_addr()? {
        metrics::init_metrics(addr)?;
    }

    let listener = Listener::bind(&config.listener)?;
    let local_addr = listener.local_addr()?;
    let backend = BackendTarget::resolve(&config.backend).await?;

    tracing::info!(
        port = local_addr.port(),
        target = %config.backend.target,
        backend = %backend.addr(),
        endpoint = %config.notifier.endpoint,
        "Listening on port {}, forwarding to {}",
        local_addr.port(),
        backend.addr()
    );

    let notifier = WebhookNotifier::new(config.notifier.endpoint_url()?, config.notifier.timeout())?;
    let dispatcher = Dispatcher::spawn(
        Arc::new(notifier),
        config.notifier.workers,
        config.notifier.queue_capacity,
    );

    let mut multiplexer = Multiplexer::new(listener, backend, config.relay.clone(), dispatcher);
    if let Some(kind) = transform_kind {
        let transform = kind.build(local_addr.port());
        tracing::info!(transform = transform.name(), "Loaded transform");
        multiplexer = multiplexer.with_transform(transform);
    }

    let shutdown = Shutdown::new();
    let relay_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        shutdown.trigger();
    });

    multiplexer.run(relay_shutdown).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
