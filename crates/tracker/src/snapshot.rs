//! Gaze snapshots and the carry-forward policy.
//!
//! A [`GazeSnapshot`] is the fixed bundle of positions and ratios the motion
//! controller compares between ticks. Capturing one from a tracker state
//! may only partly succeed (say one pupil went missing), so capture yields a
//! [`PartialSnapshot`]; [`CarryForward`] decides what a partial capture is
//! worth given the previous complete one.

use serde::{Deserialize, Serialize};

use gazecursor_vision::{Point2D, TrackedEye};

use crate::state::TrackerState;

/// The 14 values the controller consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSnapshot {
    pub eye_left: Point2D,
    pub eye_right: Point2D,
    pub pupil_left: Point2D,
    pub pupil_right: Point2D,
    pub h_ratio_left: f64,
    pub h_ratio_right: f64,
    pub v_ratio_left: f64,
    pub v_ratio_right: f64,
    pub head_anchor: Point2D,
}

impl GazeSnapshot {
    /// Capture a complete snapshot, or `None` if any field is unavailable.
    pub fn capture(state: &TrackerState) -> Option<Self> {
        PartialSnapshot::capture(state).complete()
    }

    /// Mean of the two eye centers.
    pub fn eyes_midpoint(&self) -> Point2D {
        self.eye_left.midpoint(self.eye_right)
    }

    /// Mean of the two pupil centers.
    pub fn pupils_midpoint(&self) -> Point2D {
        self.pupil_left.midpoint(self.pupil_right)
    }
}

/// A snapshot whose fields may each be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PartialSnapshot {
    pub eye_left: Option<Point2D>,
    pub eye_right: Option<Point2D>,
    pub pupil_left: Option<Point2D>,
    pub pupil_right: Option<Point2D>,
    pub h_ratio_left: Option<f64>,
    pub h_ratio_right: Option<f64>,
    pub v_ratio_left: Option<f64>,
    pub v_ratio_right: Option<f64>,
    pub head_anchor: Option<Point2D>,
}

impl PartialSnapshot {
    pub fn capture(state: &TrackerState) -> Self {
        let left = state.left.as_ref();
        let right = state.right.as_ref();
        Self {
            eye_left: left.map(TrackedEye::eye_center),
            eye_right: right.map(TrackedEye::eye_center),
            pupil_left: left.and_then(TrackedEye::pupil_center),
            pupil_right: right.and_then(TrackedEye::pupil_center),
            h_ratio_left: left.and_then(TrackedEye::horizontal_ratio),
            h_ratio_right: right.and_then(TrackedEye::horizontal_ratio),
            v_ratio_left: left.and_then(TrackedEye::vertical_ratio),
            v_ratio_right: right.and_then(TrackedEye::vertical_ratio),
            head_anchor: state.head_anchor.map(|p| p.to_f64()),
        }
    }

    pub fn complete(&self) -> Option<GazeSnapshot> {
        Some(GazeSnapshot {
            eye_left: self.eye_left?,
            eye_right: self.eye_right?,
            pupil_left: self.pupil_left?,
            pupil_right: self.pupil_right?,
            h_ratio_left: self.h_ratio_left?,
            h_ratio_right: self.h_ratio_right?,
            v_ratio_left: self.v_ratio_left?,
            v_ratio_right: self.v_ratio_right?,
            head_anchor: self.head_anchor?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fill every missing field from `previous`.
    pub fn fill_from(&self, previous: &GazeSnapshot) -> GazeSnapshot {
        GazeSnapshot {
            eye_left: self.eye_left.unwrap_or(previous.eye_left),
            eye_right: self.eye_right.unwrap_or(previous.eye_right),
            pupil_left: self.pupil_left.unwrap_or(previous.pupil_left),
            pupil_right: self.pupil_right.unwrap_or(previous.pupil_right),
            h_ratio_left: self.h_ratio_left.unwrap_or(previous.h_ratio_left),
            h_ratio_right: self.h_ratio_right.unwrap_or(previous.h_ratio_right),
            v_ratio_left: self.v_ratio_left.unwrap_or(previous.v_ratio_left),
            v_ratio_right: self.v_ratio_right.unwrap_or(previous.v_ratio_right),
            head_anchor: self.head_anchor.unwrap_or(previous.head_anchor),
        }
    }
}

impl From<GazeSnapshot> for PartialSnapshot {
    fn from(s: GazeSnapshot) -> Self {
        Self {
            eye_left: Some(s.eye_left),
            eye_right: Some(s.eye_right),
            pupil_left: Some(s.pupil_left),
            pupil_right: Some(s.pupil_right),
            h_ratio_left: Some(s.h_ratio_left),
            h_ratio_right: Some(s.h_ratio_right),
            v_ratio_left: Some(s.v_ratio_left),
            v_ratio_right: Some(s.v_ratio_right),
            head_anchor: Some(s.head_anchor),
        }
    }
}

/// What the controller sees of the tracker on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GazeObservation {
    /// Generation of the tracker state observed, if one was published.
    pub generation: Option<u64>,
    pub snapshot: PartialSnapshot,
    pub blinking: Option<bool>,
}

impl GazeObservation {
    pub fn from_state(state: &TrackerState) -> Self {
        Self {
            generation: Some(state.generation),
            snapshot: PartialSnapshot::capture(state),
            blinking: state.is_blinking(),
        }
    }

    /// Nothing published yet.
    pub fn absent() -> Self {
        Self::default()
    }

    /// A fully valid, non-blinking observation.
    pub fn of(snapshot: GazeSnapshot) -> Self {
        Self {
            generation: None,
            snapshot: snapshot.into(),
            blinking: Some(false),
        }
    }
}

/// Outcome of applying the carry-forward policy to one capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effective {
    /// The capture was complete.
    Fresh(GazeSnapshot),
    /// The capture was incomplete; missing fields came from the previous
    /// snapshot. The tick is still a miss.
    Carried(GazeSnapshot),
    /// Nothing usable: no previous snapshot, or the horizon ran out.
    Lost,
}

/// Bounded substitution of a previous snapshot for incomplete captures.
#[derive(Debug, Clone)]
pub struct CarryForward {
    horizon: u32,
    carried: u32,
}

impl CarryForward {
    pub fn new(horizon: u32) -> Self {
        Self { horizon, carried: 0 }
    }

    /// Consecutive ticks carried so far.
    pub fn carried(&self) -> u32 {
        self.carried
    }

    pub fn reset(&mut self) {
        self.carried = 0;
    }

    pub fn apply(&mut self, current: &PartialSnapshot, previous: Option<&GazeSnapshot>) -> Effective {
        if let Some(fresh) = current.complete() {
            self.carried = 0;
            return Effective::Fresh(fresh);
        }
        match previous {
            Some(prev) if self.carried < self.horizon => {
                self.carried += 1;
                Effective::Carried(current.fill_from(prev))
            }
            _ => Effective::Lost,
        }
    }
}
