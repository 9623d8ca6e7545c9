//! HTTP/1.x message reconstruction subsystem.
//!
//! # Data Flow
//! ```text
//! raw bytes of one direction (pending buffer or fresh chunk)
//!     → sanitize.rs (drop `Keep-Alive: timeout=N` lines)
//!     → splitter.rs (frame back-to-back messages by Content-Length)
//!     → message.rs (ParsedRequest / ParsedResponse)
//!     → correlator.rs (zip requests with responses by position)
//!     → Vec<Exchange> handed to the transform
//! ```
//!
//! # Design Decisions
//! - Only the blank-line delimiter and `Content-Length` are used for framing;
//!   chunked transfer encoding and HTTP/2 are not understood
//! - A message without a header delimiter is incomplete and never emitted
//! - Parsed messages are ephemeral: built for one correlation pass only

pub mod correlator;
pub mod message;
pub mod sanitize;
pub mod splitter;

pub use correlator::{correlate, CorrelationError};
pub use message::{Exchange, Headers, HttpMessage, ParsedRequest, ParsedResponse};
pub use sanitize::strip_keep_alive;
pub use splitter::{split, FramingError};
