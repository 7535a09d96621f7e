//! Cursor backend implementations.
//!
//! Each backend provides a different way to read and position the cursor.

use std::collections::VecDeque;
use std::process::Command;
use std::sync::{Arc, Mutex, MutexGuard};

use gazecursor_common::error::{GazeError, GazeResult};
use gazecursor_platform_core::{CursorDriver, ScreenPoint, ScreenSize};

const XDOTOOL: &str = "xdotool";

/// Commanded positions a [`VirtualCursor`] remembers.
pub const VIRTUAL_MOVE_HISTORY: usize = 256;

/// Drives the X11 cursor through the `xdotool` helper.
pub struct XdotoolCursor {
    screen: ScreenSize,
}

impl XdotoolCursor {
    pub fn new() -> GazeResult<Self> {
        let output = run_xdotool(&["getdisplaygeometry"])?;
        let screen = parse_display_geometry(&output).ok_or_else(|| {
            GazeError::cursor(format!("Unexpected getdisplaygeometry output: {output:?}"))
        })?;
        tracing::debug!(width = screen.width, height = screen.height, "xdotool display geometry");
        Ok(Self { screen })
    }

    pub fn is_supported() -> bool {
        std::env::var_os("DISPLAY").is_some()
            && Command::new(XDOTOOL)
                .arg("version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
    }
}

impl CursorDriver for XdotoolCursor {
    fn position(&mut self) -> GazeResult<ScreenPoint> {
        let output = run_xdotool(&["getmouselocation", "--shell"])?;
        parse_mouse_location(&output).ok_or_else(|| {
            GazeError::cursor(format!("Unexpected getmouselocation output: {output:?}"))
        })
    }

    fn move_to(&mut self, point: ScreenPoint) -> GazeResult<()> {
        run_xdotool(&["mousemove", &point.x.to_string(), &point.y.to_string()])?;
        Ok(())
    }

    fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    fn name(&self) -> &str {
        "xdotool"
    }
}

fn run_xdotool(args: &[&str]) -> GazeResult<String> {
    let output = Command::new(XDOTOOL)
        .args(args)
        .output()
        .map_err(|e| GazeError::cursor(format!("Failed to run {XDOTOOL}: {e}")))?;
    if !output.status.success() {
        return Err(GazeError::cursor(format!(
            "{XDOTOOL} {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `xdotool getdisplaygeometry` output (`"1920 1080"`).
fn parse_display_geometry(output: &str) -> Option<ScreenSize> {
    let mut parts = output.split_whitespace();
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    Some(ScreenSize::new(width, height))
}

/// Parse `xdotool getmouselocation --shell` output (`X=..`, `Y=..` lines).
fn parse_mouse_location(output: &str) -> Option<ScreenPoint> {
    let mut x = None;
    let mut y = None;
    for line in output.lines() {
        match line.trim().split_once('=') {
            Some(("X", value)) => x = value.parse().ok(),
            Some(("Y", value)) => y = value.parse().ok(),
            _ => {}
        }
    }
    Some(ScreenPoint::new(x?, y?))
}

#[derive(Debug)]
struct VirtualCursorState {
    position: ScreenPoint,
    recent_moves: VecDeque<ScreenPoint>,
    move_count: u64,
}

/// In-memory cursor. Never touches the real pointer.
pub struct VirtualCursor {
    screen: ScreenSize,
    state: Arc<Mutex<VirtualCursorState>>,
}

/// Shared view of a [`VirtualCursor`], used to simulate manual moves and
/// inspect the commands the controller issued.
#[derive(Clone)]
pub struct VirtualCursorHandle {
    state: Arc<Mutex<VirtualCursorState>>,
}

impl VirtualCursor {
    /// Create a virtual cursor resting at the screen center.
    pub fn new(screen: ScreenSize) -> Self {
        Self {
            screen,
            state: Arc::new(Mutex::new(VirtualCursorState {
                position: screen.center(),
                recent_moves: VecDeque::with_capacity(VIRTUAL_MOVE_HISTORY),
                move_count: 0,
            })),
        }
    }

    pub fn handle(&self) -> VirtualCursorHandle {
        VirtualCursorHandle {
            state: self.state.clone(),
        }
    }
}

impl CursorDriver for VirtualCursor {
    fn position(&mut self) -> GazeResult<ScreenPoint> {
        Ok(lock(&self.state).position)
    }

    fn move_to(&mut self, point: ScreenPoint) -> GazeResult<()> {
        let mut state = lock(&self.state);
        state.position = point;
        if state.recent_moves.len() == VIRTUAL_MOVE_HISTORY {
            state.recent_moves.pop_front();
        }
        state.recent_moves.push_back(point);
        state.move_count += 1;
        Ok(())
    }

    fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    fn name(&self) -> &str {
        "virtual"
    }
}

impl VirtualCursorHandle {
    /// Move the cursor as a user would, without recording a command.
    pub fn set_position(&self, point: ScreenPoint) {
        lock(&self.state).position = point;
    }

    pub fn position(&self) -> ScreenPoint {
        lock(&self.state).position
    }

    /// The last [`VIRTUAL_MOVE_HISTORY`] positions commanded through
    /// `move_to`, oldest first.
    pub fn moves(&self) -> Vec<ScreenPoint> {
        lock(&self.state).recent_moves.iter().copied().collect()
    }

    /// Number of `move_to` commands since creation.
    pub fn move_count(&self) -> u64 {
        lock(&self.state).move_count
    }
}

fn lock(state: &Mutex<VirtualCursorState>) -> MutexGuard<'_, VirtualCursorState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Detect the best available cursor backend for the current system.
pub fn detect_best_driver(fallback_screen: ScreenSize) -> Box<dyn CursorDriver> {
    if XdotoolCursor::is_supported() {
        match XdotoolCursor::new() {
            Ok(driver) => {
                tracing::info!("Using xdotool cursor backend");
                return Box::new(driver);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to initialize xdotool backend, using virtual cursor");
            }
        }
    }

    tracing::warn!(
        width = fallback_screen.width,
        height = fallback_screen.height,
        "Using virtual cursor backend — the system pointer will not move"
    );
    Box::new(VirtualCursor::new(fallback_screen))
}
