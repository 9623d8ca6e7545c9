//! The relay loop.
//!
//! One task owns the listener, every pair's sockets and pending buffers, the
//! transform and the dispatcher. Each iteration waits (bounded) for either a new
//! client or one readable socket, services exactly that one event, then pauses
//! for the configured poll delay.
//!
//! For a readable socket:
//! 1. read at most `chunk_size` bytes
//! 2. strip `Keep-Alive: timeout=N` lines
//! 3. if the chunk is a response and the peer has pending request bytes,
//!    correlate, log, transform and dispatch, then clear both pending buffers
//! 4. append the chunk to this socket's pending buffer
//! 5. on a zero-length read close the pair, otherwise forward the chunk to the peer
//!
//! Any error in these steps closes that pair only.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::future::select_all;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::config::{RelayConfig, ResponseDetection};
use crate::http::{correlate, strip_keep_alive, CorrelationError, Exchange};
use crate::net::connection::{BackendTarget, Endpoint, Role, SocketId};
use crate::net::listener::{Listener, ListenerError};
use crate::notify::Dispatcher;
use crate::observability::metrics;
use crate::transform::{Transform, TransformError};

const RESPONSE_PREFIX: &[u8] = b"HTTP/1.1";

/// Errors that close a pair.
#[derive(Debug, Error)]
pub enum PairError {
    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("failed to encode exchanges: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("socket I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("{0} has no registered peer")]
    Unpaired(SocketId),
}

/// What one readable event amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relayed {
    Forwarded,
    /// Readiness was spurious; nothing was read.
    WouldBlock,
    /// The socket was already removed with its pair.
    Stale,
    PeerClosed,
}

enum LoopEvent {
    Shutdown,
    Accepted(Result<(TcpStream, SocketAddr), ListenerError>),
    Readable(SocketId, io::Result<()>),
    Idle,
}

/// Accepts clients, pairs each with a backend connection and relays between them.
pub struct Multiplexer {
    listener: Listener,
    backend: BackendTarget,
    relay: RelayConfig,
    endpoints: HashMap<SocketId, Endpoint>,
    next_id: u64,
    /// Rotates which socket is polled first so a busy one cannot starve the rest.
    poll_round: usize,
    transform: Option<Box<dyn Transform>>,
    dispatcher: Dispatcher,
}

impl Multiplexer {
    pub fn new(
        listener: Listener,
        backend: BackendTarget,
        relay: RelayConfig,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            listener,
            backend,
            relay,
            endpoints: HashMap::new(),
            next_id: 1,
            poll_round: 0,
            transform: None,
            dispatcher,
        }
    }

    /// Map correlated exchanges through `transform` before dispatching.
    ///
    /// Without a transform the exchanges themselves are dispatched.
    pub fn with_transform(mut self, transform: Box<dyn Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Number of live client/backend pairs.
    pub fn pair_count(&self) -> usize {
        self.endpoints.len() / 2
    }

    /// Run until `shutdown` fires, then close every pair and drain the dispatcher.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            backend = %self.backend.addr(),
            transform = self.transform.as_ref().map_or("none", |t| t.name()),
            response_detection = ?self.relay.response_detection,
            "Relay loop started"
        );

        loop {
            self.poll_round = self.poll_round.wrapping_add(1);
            let readable = wait_readable(&self.endpoints, self.poll_round, self.relay.poll_timeout());
            let event = tokio::select! {
                biased;
                _ = shutdown.recv() => LoopEvent::Shutdown,
                accepted = self.listener.accept() => LoopEvent::Accepted(accepted),
                ready = readable => match ready {
                    Some((id, result)) => LoopEvent::Readable(id, result),
                    None => LoopEvent::Idle,
                },
            };

            match event {
                LoopEvent::Shutdown => break,
                LoopEvent::Accepted(Ok((stream, addr))) => self.on_accept(stream, addr).await,
                LoopEvent::Accepted(Err(e)) => {
                    tracing::warn!(error = %e, "Accept failed");
                }
                LoopEvent::Readable(id, Ok(())) => self.on_readable(id).await,
                LoopEvent::Readable(id, Err(e)) => {
                    tracing::warn!(socket = %id, error = %e, "Readiness wait failed");
                    self.teardown(id, "error");
                }
                LoopEvent::Idle => {}
            }

            let delay = self.relay.poll_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        self.stop().await;
    }

    async fn on_accept(&mut self, client: TcpStream, client_addr: SocketAddr) {
        let backend = match self.backend.connect().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(
                    client = %client_addr,
                    backend = %self.backend.addr(),
                    error = %e,
                    "Can't establish connection with backend, closing client"
                );
                metrics::record_connect_failure();
                return;
            }
        };
        let backend_addr = backend.peer_addr().unwrap_or_else(|_| self.backend.addr());
        tracing::info!(backend = %backend_addr, "Forward connected");

        let client_id = self.allocate_id();
        let backend_id = self.allocate_id();
        self.endpoints.insert(
            client_id,
            Endpoint::new(client, client_addr, Role::Client, backend_id),
        );
        self.endpoints.insert(
            backend_id,
            Endpoint::new(backend, backend_addr, Role::Backend, client_id),
        );

        metrics::record_pair_opened();
        tracing::info!(client = %client_addr, socket = %client_id, "Client connected");
    }

    async fn on_readable(&mut self, id: SocketId) {
        match self.relay_chunk(id).await {
            Ok(Relayed::PeerClosed) => self.teardown(id, "peer_closed"),
            Ok(Relayed::Forwarded | Relayed::WouldBlock | Relayed::Stale) => {}
            Err(e) => {
                tracing::warn!(socket = %id, error = %e, "Relay failed, closing pair");
                self.teardown(id, "error");
            }
        }
    }

    async fn relay_chunk(&mut self, id: SocketId) -> Result<Relayed, PairError> {
        let Some(endpoint) = self.endpoints.get(&id) else {
            return Ok(Relayed::Stale);
        };

        let mut buf = vec![0u8; self.relay.chunk_size];
        let read = match endpoint.stream.try_read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Relayed::WouldBlock),
            Err(e) => return Err(e.into()),
        };
        let (peer_id, role) = (endpoint.peer, endpoint.role);

        let Some(peer) = self.endpoints.get(&peer_id) else {
            return Err(PairError::Unpaired(id));
        };

        let chunk = strip_keep_alive(&buf[..read]);
        if read > 0 && !peer.pending.is_empty() && self.is_response(&chunk, role) {
            let exchanges = correlate(&chunk, &peer.pending)?;
            self.publish(id, &exchanges)?;
            self.clear_pending(id);
            self.clear_pending(peer_id);
        }

        if let Some(endpoint) = self.endpoints.get_mut(&id) {
            endpoint.pending.extend_from_slice(&chunk);
        }

        if read == 0 {
            return Ok(Relayed::PeerClosed);
        }

        let peer = self
            .endpoints
            .get_mut(&peer_id)
            .ok_or(PairError::Unpaired(id))?;
        peer.stream.write_all(&chunk).await?;
        Ok(Relayed::Forwarded)
    }

    fn is_response(&self, chunk: &[u8], role: Role) -> bool {
        match self.relay.response_detection {
            ResponseDetection::Sniff => chunk.starts_with(RESPONSE_PREFIX),
            ResponseDetection::BackendRole => role == Role::Backend,
        }
    }

    /// Log, transform and dispatch one batch of exchanges.
    fn publish(&self, id: SocketId, exchanges: &[Exchange]) -> Result<(), PairError> {
        for exchange in exchanges {
            tracing::info!(socket = %id, "{}", exchange.summary());
        }
        metrics::record_exchanges(exchanges.len());

        let events = match &self.transform {
            Some(transform) => transform.transform(exchanges)?,
            None => exchanges
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?,
        };

        if !events.is_empty() {
            self.dispatcher.dispatch(events);
        }
        Ok(())
    }

    fn clear_pending(&mut self, id: SocketId) {
        if let Some(endpoint) = self.endpoints.get_mut(&id) {
            endpoint.pending.clear();
        }
    }

    /// Remove both members of `id`'s pair; dropping the streams closes them.
    fn teardown(&mut self, id: SocketId, reason: &'static str) {
        let Some(endpoint) = self.endpoints.remove(&id) else {
            return;
        };
        let peer = self.endpoints.remove(&endpoint.peer);

        let client_addr = match (&endpoint, &peer) {
            (Endpoint { role: Role::Client, addr, .. }, _) => Some(*addr),
            (_, Some(peer)) => Some(peer.addr),
            _ => None,
        };
        match client_addr {
            Some(addr) => tracing::info!(client = %addr, reason, "Client disconnected"),
            None => tracing::info!(socket = %id, reason, "Client closed"),
        }

        metrics::record_pair_closed(reason);
    }

    async fn stop(mut self) {
        let pairs = self.pair_count();
        let ids: Vec<SocketId> = self.endpoints.keys().copied().collect();
        for id in ids {
            self.teardown(id, "shutdown");
        }
        tracing::info!(pairs, "Relay loop stopped");

        self.dispatcher.close().await;
    }

    fn allocate_id(&mut self) -> SocketId {
        let id = SocketId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Wait until one registered socket is readable, for at most `limit`.
async fn wait_readable(
    endpoints: &HashMap<SocketId, Endpoint>,
    round: usize,
    limit: Duration,
) -> Option<(SocketId, io::Result<()>)> {
    if endpoints.is_empty() {
        tokio::time::sleep(limit).await;
        return None;
    }

    let first = round % endpoints.len();
    let waits = endpoints
        .iter()
        .skip(first)
        .chain(endpoints.iter().take(first))
        .map(|(id, endpoint)| Box::pin(async move { (*id, endpoint.stream.readable().await) }));

    tokio::time::timeout(limit, select_all(waits))
        .await
        .ok()
        .map(|(ready, _, _)| ready)
}
