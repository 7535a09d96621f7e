//! Thresholding helpers shared by calibration and pupil localization.
//!
//! Binarized images use the imageproc convention: foreground (the dark
//! pupil/iris pixels) is 255, background is 0. Morphology and contour
//! tracing both operate on the foreground.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::median_filter;
use imageproc::morphology;

const FOREGROUND: Luma<u8> = Luma([255]);
const BACKGROUND: Luma<u8> = Luma([0]);

/// Median-filter an eye image. A radius of 0 returns an unchanged copy.
pub fn denoise(eye: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 || eye.width() == 0 || eye.height() == 0 {
        return eye.clone();
    }
    median_filter(eye, radius, radius)
}

/// Mark every pixel at or below `threshold` as foreground.
pub fn binarize(eye: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(eye.width(), eye.height(), |x, y| {
        if eye.get_pixel(x, y)[0] <= threshold {
            FOREGROUND
        } else {
            BACKGROUND
        }
    })
}

/// Shrink foreground blobs by `radius` pixels.
pub fn erode(binary: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return binary.clone();
    }
    morphology::erode(binary, Norm::LInf, radius)
}

/// Erode then dilate: removes specks smaller than the 3x3 structuring element.
pub fn open(binary: &GrayImage) -> GrayImage {
    morphology::open(binary, Norm::LInf, 1)
}

/// Fraction of foreground pixels inside the image shrunk by `margin` on
/// every side. Falls back to the whole image when the interior is empty.
pub fn dark_fraction(binary: &GrayImage, margin: u32) -> f64 {
    let (w, h) = binary.dimensions();
    let (x0, y0, x1, y1) = if w > 2 * margin && h > 2 * margin {
        (margin, margin, w - margin, h - margin)
    } else {
        (0, 0, w, h)
    };

    let total = (x1 - x0) as u64 * (y1 - y0) as u64;
    if total == 0 {
        return 0.0;
    }

    let dark = (y0..y1)
        .flat_map(|y| (x0..x1).map(move |x| (x, y)))
        .filter(|&(x, y)| binary.get_pixel(x, y)[0] != 0)
        .count() as u64;

    dark as f64 / total as f64
}
