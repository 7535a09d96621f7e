//! GazeCursor Common Utilities
//!
//! Shared infrastructure for all GazeCursor crates:
//! - Error types and result aliases
//! - Session clock and rate limiting for worker loops
//! - Cooperative shutdown signal shared by every worker
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod shutdown;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use shutdown::ShutdownSignal;
