//! Pair members and the backend target.
//!
//! # Responsibilities
//! - Identify each registered socket and tag it with its fixed role
//! - Keep a socket's pending bytes next to its peer link so both go away together
//! - Resolve the backend once and open one connection per accepted client

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;

use crate::config::{BackendConfig, ValidationError};

/// Identifier of a registered socket, unique within one multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(u64);

impl SocketId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SocketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sock-{}", self.0)
    }
}

/// Which side of the pair a socket faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Backend,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => f.write_str("client"),
            Role::Backend => f.write_str("backend"),
        }
    }
}

/// One registered socket of a pair.
#[derive(Debug)]
pub struct Endpoint {
    pub stream: TcpStream,
    pub addr: SocketAddr,
    pub role: Role,
    /// The other member of the pair.
    pub peer: SocketId,
    /// Bytes read from this socket since the pair's last successful correlation.
    pub pending: Vec<u8>,
}

impl Endpoint {
    pub fn new(stream: TcpStream, addr: SocketAddr, role: Role, peer: SocketId) -> Self {
        Self {
            stream,
            addr,
            role,
            peer,
            pending: Vec::new(),
        }
    }
}

/// Errors raised while opening a backend connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Target(#[from] ValidationError),

    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} did not resolve to any address")]
    NoAddress(String),

    #[error("connect failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
}

/// The single backend every client is forwarded to.
#[derive(Debug, Clone, Copy)]
pub struct BackendTarget {
    addr: SocketAddr,
    connect_timeout: Duration,
}

impl BackendTarget {
    pub fn new(addr: SocketAddr, connect_timeout: Duration) -> Self {
        Self {
            addr,
            connect_timeout,
        }
    }

    /// Resolve the configured target once; later connects reuse the address.
    pub async fn resolve(config: &BackendConfig) -> Result<Self, ConnectError> {
        let (host, port) = config.host_port()?;
        let addr = tokio::net::lookup_host((host.as_str(), port))
            .await
            .map_err(|source| ConnectError::Resolve {
                host: host.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| ConnectError::NoAddress(host.clone()))?;

        tracing::debug!(host = %host, address = %addr, "Backend resolved");
        Ok(Self::new(addr, config.connect_timeout()))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Open a connection, giving up after the connect timeout.
    pub async fn connect(&self) -> Result<TcpStream, ConnectError> {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(self.addr)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ConnectError::Timeout(self.connect_timeout)),
        }
    }
}
