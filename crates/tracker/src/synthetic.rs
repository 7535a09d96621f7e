//! A drawn face for headless runs.
//!
//! Renders a flat grey face with two almond eyes and dark round pupils,
//! together with the exact 68 landmarks a detector would report for it.
//! Poses are scripted per frame index, so a run is fully reproducible.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut};
use imageproc::point::Point;

use gazecursor_common::error::GazeResult;
use gazecursor_vision::{EyeSide, LandmarkSet, PixelPoint, NOSE_TIP};

use crate::acquisition::{Frame, FrameSource, LandmarkProvider};

const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;
const SKIN: u8 = 150;
const SCLERA: u8 = 230;
const PUPIL: u8 = 20;
const PUPIL_RADIUS: i32 = 4;

/// Left eye corner, and the horizontal distance to the right eye.
const LEFT_EYE_CORNER: (i32, i32) = (40, 60);
const EYE_SPACING: i32 = 56;
const EYE_WIDTH: i32 = 24;
const NOSE: (i32, i32) = (80, 80);
const CHIN: (i32, i32) = (80, 105);

/// Where the face is in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacePose {
    /// Whole-face translation (px).
    pub head_dx: f64,
    pub head_dy: f64,
    /// Pupil shift from the eye center along the corner axis (px).
    pub pupil_dx: f64,
    pub eyes_closed: bool,
    pub visible: bool,
}

impl Default for FacePose {
    fn default() -> Self {
        Self {
            head_dx: 0.0,
            head_dy: 0.0,
            pupil_dx: 0.0,
            eyes_closed: false,
            visible: true,
        }
    }
}

type Script = Arc<dyn Fn(u64) -> FacePose + Send + Sync>;

/// A scripted synthetic face.
#[derive(Clone)]
pub struct SyntheticFace {
    script: Script,
}

impl std::fmt::Debug for SyntheticFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticFace").finish_non_exhaustive()
    }
}

impl SyntheticFace {
    /// The same pose on every frame.
    pub fn new(pose: FacePose) -> Self {
        Self::scripted(move |_| pose)
    }

    pub fn scripted(script: impl Fn(u64) -> FacePose + Send + Sync + 'static) -> Self {
        Self {
            script: Arc::new(script),
        }
    }

    /// Head sways left and right by `amplitude` px every `period` frames.
    pub fn swaying(amplitude: f64, period: u64) -> Self {
        let period = period.max(1) as f64;
        Self::scripted(move |i| FacePose {
            head_dx: amplitude * (TAU * i as f64 / period).sin(),
            ..FacePose::default()
        })
    }

    pub fn pose(&self, index: u64) -> FacePose {
        (self.script)(index)
    }

    /// Render frame `index`.
    pub fn frame(&self, index: u64) -> Frame {
        Frame::new(index, render(&self.pose(index)))
    }

    /// Landmarks for frame `index`, `None` if the face is not visible.
    pub fn landmarks(&self, index: u64) -> Option<LandmarkSet> {
        let pose = self.pose(index);
        if !pose.visible {
            return None;
        }
        LandmarkSet::new(landmark_points(&pose)).ok()
    }

    /// Split into a frame source (stopping after `limit` frames, if given)
    /// and the matching landmark provider.
    pub fn split(&self, limit: Option<u64>) -> (SyntheticFrames, SyntheticLandmarks) {
        (
            SyntheticFrames {
                face: self.clone(),
                next: 0,
                limit,
                interval: None,
                next_due: None,
            },
            SyntheticLandmarks { face: self.clone() },
        )
    }
}

/// Frame source half of a [`SyntheticFace`].
#[derive(Debug)]
pub struct SyntheticFrames {
    face: SyntheticFace,
    next: u64,
    limit: Option<u64>,
    interval: Option<Duration>,
    next_due: Option<Instant>,
}

impl SyntheticFrames {
    /// Deliver at most one frame per `interval`, like a camera would.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }
}

impl FrameSource for SyntheticFrames {
    fn next_frame(&mut self) -> GazeResult<Option<Frame>> {
        if self.is_exhausted() {
            return Ok(None);
        }
        if let Some(interval) = self.interval {
            let now = Instant::now();
            if self.next_due.is_some_and(|due| now < due) {
                return Ok(None);
            }
            self.next_due = Some(now + interval);
        }
        let frame = self.face.frame(self.next);
        self.next += 1;
        Ok(Some(frame))
    }

    fn is_exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.next >= limit)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Landmark provider half of a [`SyntheticFace`].
#[derive(Debug)]
pub struct SyntheticLandmarks {
    face: SyntheticFace,
}

impl LandmarkProvider for SyntheticLandmarks {
    fn detect(&mut self, frame: &Frame) -> GazeResult<Option<LandmarkSet>> {
        Ok(self.face.landmarks(frame.index))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

fn shift(pose: &FacePose, (x, y): (i32, i32)) -> PixelPoint {
    PixelPoint::new(
        x + pose.head_dx.round() as i32,
        y + pose.head_dy.round() as i32,
    )
}

/// Six eye points in landmark contour order.
fn eye_contour(pose: &FacePose, side: EyeSide) -> [PixelPoint; 6] {
    let (cx, cy) = match side {
        EyeSide::Left => LEFT_EYE_CORNER,
        EyeSide::Right => (LEFT_EYE_CORNER.0 + EYE_SPACING, LEFT_EYE_CORNER.1),
    };
    let lid = if pose.eyes_closed { 1 } else { 5 };
    let third = EYE_WIDTH / 3;
    [
        (cx, cy),
        (cx + third, cy - lid),
        (cx + 2 * third, cy - lid),
        (cx + EYE_WIDTH, cy),
        (cx + 2 * third, cy + lid),
        (cx + third, cy + lid),
    ]
    .map(|p| shift(pose, p))
}

fn landmark_points(pose: &FacePose) -> Vec<PixelPoint> {
    let mut points = vec![shift(pose, CHIN); LandmarkSet::LEN];
    for side in EyeSide::BOTH {
        for (index, point) in side.landmark_indices().into_iter().zip(eye_contour(pose, side)) {
            points[index] = point;
        }
    }
    points[NOSE_TIP] = shift(pose, NOSE);
    points
}

fn render(pose: &FacePose) -> GrayImage {
    let mut image = GrayImage::from_pixel(WIDTH, HEIGHT, Luma([SKIN]));
    if !pose.visible {
        return image;
    }
    for side in EyeSide::BOTH {
        let contour = eye_contour(pose, side);
        let polygon: Vec<Point<i32>> = contour.iter().map(|p| Point::new(p.x, p.y)).collect();
        draw_polygon_mut(&mut image, &polygon, Luma([SCLERA]));

        if !pose.eyes_closed {
            let center_x = (contour[0].x + contour[3].x) / 2 + pose.pupil_dx.round() as i32;
            draw_filled_circle_mut(&mut image, (center_x, contour[0].y), PUPIL_RADIUS, Luma([PUPIL]));
        }
    }
    image
}
