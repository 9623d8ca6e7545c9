//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, backlog 200)
//!     → connection.rs (open the matched backend connection, with timeout)
//!     → multiplexer.rs (register both sockets as one pair, relay bytes,
//!                       correlate exchanges, hand them to transform + dispatcher)
//!
//! Pair States:
//!     Connecting → Relaying → Closed
//! ```
//!
//! # Design Decisions
//! - One task owns every socket, pending buffer and pairing link; nothing is shared
//! - Both sockets of a pair are registered and removed together
//! - Any error on a pair closes that pair only
//! - Bytes are forwarded unmodified except for `Keep-Alive: timeout=N` lines

pub mod connection;
pub mod listener;
pub mod multiplexer;

pub use connection::{BackendTarget, ConnectError, Endpoint, Role, SocketId};
pub use listener::{Listener, ListenerError};
pub use multiplexer::{Multiplexer, PairError};
