//! GazeCursor platform core contracts.
//!
//! This crate contains the screen geometry types and the cursor driver
//! contract used by the controller without coupling to a concrete OS backend.

use serde::{Deserialize, Serialize};

use gazecursor_common::error::GazeResult;

/// A cursor position in absolute screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Shift by an integer pixel delta.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Euclidean distance in pixels.
    pub fn distance_to(self, other: ScreenPoint) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        dx.hypot(dy)
    }
}

/// Screen resolution in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The recentering reference point.
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new((self.width / 2) as i32, (self.height / 2) as i32)
    }

    /// Clamp `point` so it stays at least `inset` pixels away from every edge.
    ///
    /// Screens too small for the inset collapse to the center line.
    pub fn clamp_inset(&self, point: ScreenPoint, inset: i32) -> ScreenPoint {
        let max_x = self.width as i32 - inset;
        let max_y = self.height as i32 - inset;
        let (lo_x, hi_x) = if inset <= max_x {
            (inset, max_x)
        } else {
            let c = self.center().x;
            (c, c)
        };
        let (lo_y, hi_y) = if inset <= max_y {
            (inset, max_y)
        } else {
            let c = self.center().y;
            (c, c)
        };
        ScreenPoint::new(point.x.clamp(lo_x, hi_x), point.y.clamp(lo_y, hi_y))
    }
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

/// Synchronous cursor positioning contract.
///
/// Implementations must not block for longer than a single syscall or
/// helper invocation: the control loop calls these once per tick.
pub trait CursorDriver: Send {
    /// Current cursor position.
    fn position(&mut self) -> GazeResult<ScreenPoint>;

    /// Move the cursor to an absolute position.
    fn move_to(&mut self, point: ScreenPoint) -> GazeResult<()>;

    /// Size of the screen the cursor moves on.
    fn screen_size(&self) -> ScreenSize;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

impl<T: CursorDriver + ?Sized> CursorDriver for Box<T> {
    fn position(&mut self) -> GazeResult<ScreenPoint> {
        (**self).position()
    }

    fn move_to(&mut self, point: ScreenPoint) -> GazeResult<()> {
        (**self).move_to(point)
    }

    fn screen_size(&self) -> ScreenSize {
        (**self).screen_size()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamp_keeps_inset_on_all_sides() {
        let screen = ScreenSize::new(1920, 1080);
        assert_eq!(
            screen.clamp_inset(ScreenPoint::new(-40, 2000), 5),
            ScreenPoint::new(5, 1075)
        );
        assert_eq!(
            screen.clamp_inset(ScreenPoint::new(5000, 3), 5),
            ScreenPoint::new(1915, 5)
        );
        assert_eq!(
            screen.clamp_inset(ScreenPoint::new(700, 400), 5),
            ScreenPoint::new(700, 400)
        );
    }

    #[test]
    fn test_tiny_screen_collapses_to_center() {
        let screen = ScreenSize::new(6, 6);
        assert_eq!(
            screen.clamp_inset(ScreenPoint::new(0, 6), 5),
            ScreenPoint::new(3, 3)
        );
    }

    #[test]
    fn test_center_is_half_resolution() {
        assert_eq!(ScreenSize::new(1920, 1080).center(), ScreenPoint::new(960, 540));
    }

    proptest! {
        #[test]
        fn test_clamped_point_is_inside_inset_bounds(
            x in -10_000i32..10_000,
            y in -10_000i32..10_000,
            w in 20u32..5000,
            h in 20u32..5000,
        ) {
            let screen = ScreenSize::new(w, h);
            let p = screen.clamp_inset(ScreenPoint::new(x, y), 5);
            prop_assert!(p.x >= 5 && p.x <= w as i32 - 5);
            prop_assert!(p.y >= 5 && p.y <= h as i32 - 5);
        }
    }
}
