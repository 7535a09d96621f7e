//! Facial landmark types (68-point Multi-PIE indexing).
//!
//! Landmarks come from an external provider. Indices with a fixed
//! semantic role are named here; nothing else in the workspace should
//! hard-code landmark numbers.

use serde::{Deserialize, Serialize};

use gazecursor_common::error::{GazeError, GazeResult};

/// Integer pixel coordinate in frame space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_f64(self) -> Point2D {
        Point2D::new(self.x as f64, self.y as f64)
    }
}

/// Sub-pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(self, other: Point2D) -> Point2D {
        Point2D::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn offset(self, dx: f64, dy: f64) -> Point2D {
        Point2D::new(self.x + dx, self.y + dy)
    }
}

/// Which eye, in image terms: `Left` is the eye at landmarks 36..=41.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EyeSide {
    Left,
    Right,
}

impl EyeSide {
    pub const BOTH: [EyeSide; 2] = [EyeSide::Left, EyeSide::Right];

    /// Landmark indices in contour order: corner, two upper lid points,
    /// corner, two lower lid points.
    pub fn landmark_indices(self) -> [usize; 6] {
        match self {
            EyeSide::Left => [36, 37, 38, 39, 40, 41],
            EyeSide::Right => [42, 43, 44, 45, 46, 47],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EyeSide::Left => "left",
            EyeSide::Right => "right",
        }
    }
}

/// Index of the nose tip, used as the head anchor.
pub const NOSE_TIP: usize = 30;

/// The 68 landmarks detected on one face in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: Vec<PixelPoint>,
}

impl LandmarkSet {
    pub const LEN: usize = 68;

    pub fn new(points: Vec<PixelPoint>) -> GazeResult<Self> {
        if points.len() != Self::LEN {
            return Err(GazeError::landmarks(format!(
                "expected {} landmarks, got {}",
                Self::LEN,
                points.len()
            )));
        }
        Ok(Self { points })
    }

    pub fn point(&self, index: usize) -> PixelPoint {
        self.points[index]
    }

    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }

    /// The six contour points of one eye.
    pub fn eye(&self, side: EyeSide) -> [PixelPoint; 6] {
        side.landmark_indices().map(|i| self.points[i])
    }

    /// Head anchor (nose tip).
    pub fn head_anchor(&self) -> PixelPoint {
        self.points[NOSE_TIP]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_point_count() {
        let err = LandmarkSet::new(vec![PixelPoint::default(); 5]).unwrap_err();
        assert!(matches!(err, GazeError::Landmarks { .. }));
    }

    #[test]
    fn test_eye_and_anchor_use_fixed_indices() {
        let points = (0..68).map(|i| PixelPoint::new(i, -i)).collect();
        let set = LandmarkSet::new(points).unwrap();
        assert_eq!(set.eye(EyeSide::Left)[0], PixelPoint::new(36, -36));
        assert_eq!(set.eye(EyeSide::Right)[5], PixelPoint::new(47, -47));
        assert_eq!(set.head_anchor(), PixelPoint::new(30, -30));
    }
}
