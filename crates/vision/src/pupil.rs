//! Pupil localization on an isolated eye.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use serde::{Deserialize, Serialize};

use gazecursor_common::config::TrackingConfig;

use crate::binarize;
use crate::landmarks::Point2D;

/// Blobs covering more than this share of the crop are lighting artifacts
/// (the whole eye went dark), not a pupil.
const MAX_BLOB_FRACTION: f64 = 0.8;

/// Result of a pupil search, in eye-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PupilLocation {
    Located {
        x: f64,
        y: f64,
    },
    #[default]
    NotLocated,
}

impl PupilLocation {
    pub fn is_located(&self) -> bool {
        matches!(self, PupilLocation::Located { .. })
    }

    pub fn point(&self) -> Option<Point2D> {
        match *self {
            PupilLocation::Located { x, y } => Some(Point2D::new(x, y)),
            PupilLocation::NotLocated => None,
        }
    }
}

/// Finds the pupil centroid in a masked eye crop.
#[derive(Debug, Clone)]
pub struct PupilLocator {
    erosion: u8,
    min_area: f64,
    noise_radius: u32,
}

impl PupilLocator {
    pub fn new(erosion: u8, min_area: f64, noise_radius: u32) -> Self {
        Self {
            erosion,
            min_area,
            noise_radius,
        }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        Self::new(
            config.pupil_erosion,
            config.min_pupil_area,
            config.noise_radius,
        )
    }

    /// Binarize at `threshold`, erode, and return the centroid of the
    /// plausible blob nearest the crop center.
    pub fn locate(&self, eye: &GrayImage, threshold: u8) -> PupilLocation {
        let (w, h) = eye.dimensions();
        if w == 0 || h == 0 {
            return PupilLocation::NotLocated;
        }

        let smoothed = binarize::denoise(eye, self.noise_radius);
        let binary = binarize::erode(&binarize::binarize(&smoothed, threshold), self.erosion);

        let max_area = w as f64 * h as f64 * MAX_BLOB_FRACTION;
        let center = Point2D::new(w as f64 / 2.0, h as f64 / 2.0);

        find_contours::<i32>(&binary)
            .iter()
            .filter(|c| c.border_type == BorderType::Outer)
            .filter_map(blob_moments)
            .filter(|blob| blob.area >= self.min_area && blob.area <= max_area)
            .min_by(|a, b| {
                let da = a.centroid.distance_to(center);
                let db = b.centroid.distance_to(center);
                da.total_cmp(&db).then(b.area.total_cmp(&a.area))
            })
            .map(|blob| PupilLocation::Located {
                x: blob.centroid.x,
                y: blob.centroid.y,
            })
            .unwrap_or(PupilLocation::NotLocated)
    }
}

impl Default for PupilLocator {
    fn default() -> Self {
        Self::from_config(&TrackingConfig::default())
    }
}

#[derive(Debug, Clone, Copy)]
struct Blob {
    area: f64,
    centroid: Point2D,
}

/// Zeroth and first order moments of the polygon traced by a contour.
fn blob_moments(contour: &Contour<i32>) -> Option<Blob> {
    let points = &contour.points;
    if points.len() < 3 {
        return None;
    }

    let (mut m00, mut m10, mut m01) = (0.0f64, 0.0f64, 0.0f64);
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        let (x0, y0, x1, y1) = (p.x as f64, p.y as f64, q.x as f64, q.y as f64);
        let cross = x0 * y1 - x1 * y0;
        m00 += cross;
        m10 += (x0 + x1) * cross;
        m01 += (y0 + y1) * cross;
    }
    m00 /= 2.0;
    if m00.abs() <= f64::EPSILON {
        return None;
    }

    Some(Blob {
        area: m00.abs(),
        centroid: Point2D::new(m10 / (6.0 * m00), m01 / (6.0 * m00)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_circle_mut;

    fn eye_with_blob(cx: i32, cy: i32, radius: i32, intensity: u8) -> GrayImage {
        let mut eye = GrayImage::from_pixel(40, 30, Luma([200]));
        draw_filled_circle_mut(&mut eye, (cx, cy), radius, Luma([intensity]));
        eye
    }

    #[test]
    fn test_finds_circular_blob_at_or_above_its_intensity() {
        let eye = eye_with_blob(22, 14, 5, 20);
        let locator = PupilLocator::default();
        for threshold in [20u8, 45, 90] {
            let p = locator.locate(&eye, threshold).point().expect("pupil");
            assert!((p.x - 22.0).abs() <= 1.0, "x={} at t={threshold}", p.x);
            assert!((p.y - 14.0).abs() <= 1.0, "y={} at t={threshold}", p.y);
        }
    }

    #[test]
    fn test_threshold_below_blob_intensity_finds_nothing() {
        let eye = eye_with_blob(22, 14, 5, 20);
        assert_eq!(
            PupilLocator::default().locate(&eye, 19),
            PupilLocation::NotLocated
        );
    }

    #[test]
    fn test_picks_blob_nearest_center() {
        let mut eye = eye_with_blob(21, 15, 4, 20);
        draw_filled_circle_mut(&mut eye, (6, 6), 4, Luma([20]));
        let p = PupilLocator::default().locate(&eye, 30).point().unwrap();
        assert!((p.x - 21.0).abs() <= 1.0);
        assert!((p.y - 15.0).abs() <= 1.0);
    }

    #[test]
    fn test_fully_dark_eye_is_not_a_pupil() {
        let eye = GrayImage::from_pixel(40, 30, Luma([10]));
        assert_eq!(
            PupilLocator::default().locate(&eye, 50),
            PupilLocation::NotLocated
        );
    }

    #[test]
    fn test_empty_crop_is_not_located() {
        assert_eq!(
            PupilLocator::default().locate(&GrayImage::new(0, 0), 50),
            PupilLocation::NotLocated
        );
    }
}
