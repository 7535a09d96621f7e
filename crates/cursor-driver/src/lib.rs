//! GazeCursor Cursor Driver
//!
//! Moves and observes the system cursor on behalf of the motion
//! controller. Uses a pluggable backend architecture:
//!
//! - **xdotool:** X11 sessions, via the `xdotool` helper binary
//! - **Virtual:** In-memory cursor for tests, replays and headless runs
//!
//! The backend contract itself lives in `gazecursor-platform-core`.

pub mod backends;

pub use backends::{detect_best_driver, VirtualCursor, VirtualCursorHandle, XdotoolCursor};
pub use gazecursor_platform_core::{CursorDriver, ScreenPoint, ScreenSize};
