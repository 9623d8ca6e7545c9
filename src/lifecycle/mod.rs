//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse CLI/env → Validate → Bind listener → Resolve backend → Start dispatcher → Run loop
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Close every pair → Drain dispatcher → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Only startup errors are fatal to the process
//! - Shutdown is cooperative: the relay loop observes it between iterations

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_shutdown_signal;
