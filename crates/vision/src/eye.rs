//! Eye isolation and gaze geometry.
//!
//! An [`EyeRegion`] is rebuilt from scratch every frame: the six eye
//! landmarks define a polygon, everything outside it is painted white, and
//! the result is cropped to the polygon's bounding box plus a margin.
//! Coordinates inside the crop are "eye-local"; `origin` maps them back to
//! the frame.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use crate::landmarks::{EyeSide, PixelPoint, Point2D};
use crate::pupil::PupilLocation;

/// Value painted over pixels outside the eye polygon.
const MASK_FILL: u8 = 255;

/// One isolated eye.
#[derive(Debug, Clone)]
pub struct EyeRegion {
    side: EyeSide,
    points: [PixelPoint; 6],
    image: GrayImage,
    origin: PixelPoint,
    center: Point2D,
    radius: f64,
    blink_ratio: Option<f64>,
}

impl EyeRegion {
    /// Isolate one eye from `frame`.
    ///
    /// `points` must be in landmark contour order (see
    /// [`EyeSide::landmark_indices`]). The crop box is clipped to the
    /// frame, so eyes partly outside the image still produce a region.
    pub fn isolate(frame: &GrayImage, side: EyeSide, points: [PixelPoint; 6], margin: u32) -> Self {
        let margin = margin as i64;
        let (fw, fh) = (frame.width() as i64, frame.height() as i64);

        let min_x = points.iter().map(|p| p.x as i64).min().unwrap_or(0) - margin;
        let max_x = points.iter().map(|p| p.x as i64).max().unwrap_or(0) + margin;
        let min_y = points.iter().map(|p| p.y as i64).min().unwrap_or(0) - margin;
        let max_y = points.iter().map(|p| p.y as i64).max().unwrap_or(0) + margin;

        let x0 = min_x.clamp(0, fw);
        let y0 = min_y.clamp(0, fh);
        let x1 = max_x.clamp(x0, fw);
        let y1 = max_y.clamp(y0, fh);
        let (cw, ch) = ((x1 - x0) as u32, (y1 - y0) as u32);

        let mut mask = GrayImage::new(cw, ch);
        let polygon = local_polygon(&points, x0 as i32, y0 as i32);
        if polygon.len() >= 3 && cw > 0 && ch > 0 {
            draw_polygon_mut(&mut mask, &polygon, Luma([255u8]));
        }

        let image = GrayImage::from_fn(cw, ch, |x, y| {
            if mask.get_pixel(x, y)[0] != 0 {
                *frame.get_pixel(x0 as u32 + x, y0 as u32 + y)
            } else {
                Luma([MASK_FILL])
            }
        });

        let width = if cw <= 1 { 2 } else { cw } as f64;
        let height = if ch <= 1 { 2 } else { ch } as f64;

        Self {
            side,
            points,
            image,
            origin: PixelPoint::new(x0 as i32, y0 as i32),
            center: Point2D::new(width / 2.0, height / 2.0),
            radius: (width + height) / 4.0,
            blink_ratio: blink_ratio(&points),
        }
    }

    pub fn side(&self) -> EyeSide {
        self.side
    }

    pub fn points(&self) -> &[PixelPoint; 6] {
        &self.points
    }

    /// The masked, cropped eye bitmap.
    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// Top-left corner of the crop in frame coordinates.
    pub fn origin(&self) -> PixelPoint {
        self.origin
    }

    /// Crop center in eye-local coordinates.
    pub fn local_center(&self) -> Point2D {
        self.center
    }

    /// Crop center in frame coordinates.
    pub fn eye_center(&self) -> Point2D {
        self.to_frame(self.center)
    }

    /// Approximate eye radius, for drawing.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Eyelid width over eyelid height. `None` when the lids touch.
    pub fn blink_ratio(&self) -> Option<f64> {
        self.blink_ratio
    }

    /// Translate an eye-local point to frame coordinates.
    pub fn to_frame(&self, local: Point2D) -> Point2D {
        local.offset(self.origin.x as f64, self.origin.y as f64)
    }

    /// Outer/inner corners, image-left first.
    fn corners(&self) -> (Point2D, Point2D) {
        (self.points[0].to_f64(), self.points[3].to_f64())
    }

    /// Upper and lower lid midpoints.
    fn lids(&self) -> (Point2D, Point2D) {
        lid_midpoints(&self.points)
    }
}

/// An isolated eye together with this frame's pupil search result.
#[derive(Debug, Clone)]
pub struct TrackedEye {
    pub region: EyeRegion,
    pub pupil: PupilLocation,
}

impl TrackedEye {
    pub fn new(region: EyeRegion, pupil: PupilLocation) -> Self {
        Self { region, pupil }
    }

    pub fn pupil_located(&self) -> bool {
        self.pupil.is_located()
    }

    pub fn eye_center(&self) -> Point2D {
        self.region.eye_center()
    }

    /// Pupil position in frame coordinates.
    pub fn pupil_center(&self) -> Option<Point2D> {
        self.pupil.point().map(|p| self.region.to_frame(p))
    }

    /// 0.0 = pupil at the image-left corner, 1.0 = at the image-right corner.
    pub fn horizontal_ratio(&self) -> Option<f64> {
        let pupil = self.pupil_center()?;
        let (a, b) = self.region.corners();
        axis_ratio(a, b, pupil)
    }

    /// 0.0 = pupil at the upper lid, 1.0 = at the lower lid.
    pub fn vertical_ratio(&self) -> Option<f64> {
        let pupil = self.pupil_center()?;
        let (top, bottom) = self.region.lids();
        axis_ratio(top, bottom, pupil)
    }

    pub fn blink_ratio(&self) -> Option<f64> {
        self.region.blink_ratio()
    }
}

/// Position of `p` along the axis `a → b`, normalized by the axis length.
///
/// The triangle `(a, b, p)` gives the perpendicular height of `p` over the
/// axis (Heron's formula); Pythagoras on the distance `a → p` then leaves
/// the along-axis component. Points projecting behind `a` count as
/// negative. The result is clamped to `[0, 1]`; `None` when `a == b`.
pub fn axis_ratio(a: Point2D, b: Point2D, p: Point2D) -> Option<f64> {
    let span = a.distance_to(b);
    if span <= f64::EPSILON {
        return None;
    }
    let to_a = a.distance_to(p);
    let to_b = p.distance_to(b);

    let s = (span + to_a + to_b) / 2.0;
    let area = (s * (s - span) * (s - to_a) * (s - to_b)).max(0.0).sqrt();
    let height = 2.0 * area / span;

    let mut along = (to_a * to_a - height * height).max(0.0).sqrt();
    if to_b * to_b > span * span + to_a * to_a {
        along = -along;
    }

    Some((along / span).clamp(0.0, 1.0))
}

/// Eyelid width over eyelid height for six eye points.
fn blink_ratio(points: &[PixelPoint; 6]) -> Option<f64> {
    let width = points[0].to_f64().distance_to(points[3].to_f64());
    let (top, bottom) = lid_midpoints(points);
    let height = top.distance_to(bottom);
    if height <= f64::EPSILON {
        return None;
    }
    Some(width / height)
}

fn lid_midpoints(points: &[PixelPoint; 6]) -> (Point2D, Point2D) {
    let top = points[1].to_f64().midpoint(points[2].to_f64());
    let bottom = points[5].to_f64().midpoint(points[4].to_f64());
    (top, bottom)
}

/// Eye points shifted into crop coordinates, with repeated vertices removed
/// (the polygon filler rejects a closing vertex equal to the first).
fn local_polygon(points: &[PixelPoint; 6], x0: i32, y0: i32) -> Vec<Point<i32>> {
    let mut polygon: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for p in points {
        let local = Point::new(p.x - x0, p.y - y0);
        if polygon.last() != Some(&local) {
            polygon.push(local);
        }
    }
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    polygon
}
