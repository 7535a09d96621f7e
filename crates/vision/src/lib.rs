//! GazeCursor Vision — per-frame gaze features
//!
//! Turns a grayscale frame plus 68 facial landmarks into per-eye features:
//! - **Eye isolation:** polygon-masked crop of each eye, blink ratio
//! - **Calibration:** per-eye binarization threshold search that freezes
//!   after a fixed number of samples
//! - **Pupil localization:** threshold, erode, pick the most central blob
//! - **Gaze geometry:** horizontal/vertical gaze ratios
//!
//! This crate is pure computation — no I/O, no threads.
//! All inputs are data; all outputs are data.

pub mod binarize;
pub mod calibration;
pub mod eye;
pub mod landmarks;
pub mod pupil;

pub use calibration::{Calibration, CalibrationState};
pub use eye::{axis_ratio, EyeRegion, TrackedEye};
pub use landmarks::{EyeSide, LandmarkSet, PixelPoint, Point2D, NOSE_TIP};
pub use pupil::{PupilLocation, PupilLocator};
