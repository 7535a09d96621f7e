//! GazeCursor Engine
//!
//! Wires one frame source, one landmark provider, one cursor driver and
//! any number of renderers into a running session of three workers:
//!
//! - **Acquisition** (blocking thread): the only writer of tracker state
//! - **Control** (async task): one motion-controller tick per interval
//! - **Presentation** (blocking thread): best-effort rendering
//!
//! The workers share nothing but the state channel and one shutdown signal.

pub mod session;

pub use session::{GazeSession, SessionInputs, SessionOptions, SessionReport, SessionState};
