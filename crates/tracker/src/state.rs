//! The per-frame tracker state.
//!
//! A [`TrackerState`] is built once by the acquisition worker and never
//! mutated afterwards. Every derived query returns `Option`: `None` means
//! "no opinion" (no face, or a pupil was not located), which callers must
//! not confuse with `Some(false)`.

use std::sync::Arc;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use gazecursor_vision::{LandmarkSet, PixelPoint, TrackedEye};

/// Average blink ratio strictly above this counts as a blink.
pub const BLINK_THRESHOLD: f64 = 3.8;

/// Average horizontal ratio at or below this means "looking right".
pub const LOOK_RIGHT_MAX: f64 = 0.4;

/// Average horizontal ratio at or above this means "looking left".
pub const LOOK_LEFT_MIN: f64 = 0.6;

/// Coarse horizontal gaze direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookDirection {
    Right,
    Center,
    Left,
}

impl LookDirection {
    pub fn classify(horizontal_ratio: f64) -> Self {
        if horizontal_ratio <= LOOK_RIGHT_MAX {
            LookDirection::Right
        } else if horizontal_ratio >= LOOK_LEFT_MIN {
            LookDirection::Left
        } else {
            LookDirection::Center
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LookDirection::Right => "right",
            LookDirection::Center => "center",
            LookDirection::Left => "left",
        }
    }
}

/// Everything the acquisition worker learned from one frame.
#[derive(Debug, Clone)]
pub struct TrackerState {
    /// Monotonic publish counter, starting at 1.
    pub generation: u64,

    /// Source frame index.
    pub frame_index: u64,

    /// Nanoseconds since session start when the frame was processed.
    pub timestamp_ns: u64,

    /// The grayscale frame the state was computed from.
    pub frame: Arc<GrayImage>,

    /// Landmarks of the first detected face, if any.
    pub landmarks: Option<LandmarkSet>,

    /// Image-left eye (landmarks 36..=41).
    pub left: Option<TrackedEye>,

    /// Image-right eye (landmarks 42..=47).
    pub right: Option<TrackedEye>,

    /// Nose tip, in frame coordinates.
    pub head_anchor: Option<PixelPoint>,
}

impl TrackerState {
    /// A state with no face in it.
    pub fn empty(generation: u64, frame_index: u64, timestamp_ns: u64, frame: Arc<GrayImage>) -> Self {
        Self {
            generation,
            frame_index,
            timestamp_ns,
            frame,
            landmarks: None,
            left: None,
            right: None,
            head_anchor: None,
        }
    }

    pub fn face_detected(&self) -> bool {
        self.landmarks.is_some()
    }

    /// True when both eyes exist and both pupils were located.
    pub fn pupils_located(&self) -> bool {
        self.both_eyes()
            .is_some_and(|(l, r)| l.pupil_located() && r.pupil_located())
    }

    pub fn horizontal_ratio(&self) -> Option<f64> {
        let (l, r) = self.both_eyes()?;
        Some((l.horizontal_ratio()? + r.horizontal_ratio()?) / 2.0)
    }

    pub fn vertical_ratio(&self) -> Option<f64> {
        let (l, r) = self.both_eyes()?;
        Some((l.vertical_ratio()? + r.vertical_ratio()?) / 2.0)
    }

    /// Average eyelid width/height ratio of both eyes.
    pub fn blink_ratio(&self) -> Option<f64> {
        if !self.pupils_located() {
            return None;
        }
        let (l, r) = self.both_eyes()?;
        Some((l.blink_ratio()? + r.blink_ratio()?) / 2.0)
    }

    pub fn is_blinking(&self) -> Option<bool> {
        self.blink_ratio().map(|ratio| ratio > BLINK_THRESHOLD)
    }

    pub fn look_direction(&self) -> Option<LookDirection> {
        self.horizontal_ratio().map(LookDirection::classify)
    }

    pub fn is_right(&self) -> Option<bool> {
        self.look_direction().map(|d| d == LookDirection::Right)
    }

    pub fn is_left(&self) -> Option<bool> {
        self.look_direction().map(|d| d == LookDirection::Left)
    }

    pub fn is_center(&self) -> Option<bool> {
        self.look_direction().map(|d| d == LookDirection::Center)
    }

    /// Human readable status, blinking taking precedence over direction.
    pub fn status_label(&self) -> &'static str {
        if self.is_blinking() == Some(true) {
            return "blinking";
        }
        match self.look_direction() {
            Some(LookDirection::Right) => "looking right",
            Some(LookDirection::Left) => "looking left",
            Some(LookDirection::Center) => "looking center",
            None if self.face_detected() => "pupils not located",
            None => "no face",
        }
    }

    fn both_eyes(&self) -> Option<(&TrackedEye, &TrackedEye)> {
        Some((self.left.as_ref()?, self.right.as_ref()?))
    }
}
