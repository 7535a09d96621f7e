//! Text drawn onto annotated frames.
//!
//! TrueType through `rusttype` when a font file can be found, otherwise a
//! built-in 3x5 bitmap face.

use std::fmt;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use rusttype::{point, Font, Scale};

/// Searched in order after the configured font.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

/// Glyph coverage above which a TrueType pixel is painted.
const COVERAGE_CUTOFF: f32 = 0.3;

/// Bitmap cell: 3 columns plus 1 spacing, 5 rows plus 2 spacing.
const CELL_WIDTH: i32 = 4;
const CELL_HEIGHT: u32 = 7;

#[derive(Default)]
pub enum LabelFont {
    Truetype(Font<'static>),
    #[default]
    Bitmap,
}

impl fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelFont::Truetype(_) => f.write_str("LabelFont::Truetype"),
            LabelFont::Bitmap => f.write_str("LabelFont::Bitmap"),
        }
    }
}

impl LabelFont {
    /// The first readable font among `preferred` and the usual system
    /// locations, else the bitmap face.
    pub fn load(preferred: Option<&Path>) -> Self {
        if let Some(path) = preferred {
            match Self::from_file(path) {
                Some(font) => return font,
                None => tracing::warn!(path = %path.display(), "Label font unusable, searching system fonts"),
            }
        }

        for path in SYSTEM_FONTS.iter().map(PathBuf::from) {
            if path.exists() {
                if let Some(font) = Self::from_file(&path) {
                    return font;
                }
            }
        }

        tracing::debug!("No TrueType font found, using bitmap labels");
        LabelFont::Bitmap
    }

    fn from_file(path: &Path) -> Option<Self> {
        let data = std::fs::read(path).ok()?;
        let font = Font::try_from_vec(data)?;
        tracing::debug!(path = %path.display(), "Loaded label font");
        Some(LabelFont::Truetype(font))
    }

    /// Pixel height of one text line at `scale`.
    pub fn line_height(scale: u32) -> u32 {
        CELL_HEIGHT * scale.max(1)
    }

    /// Draw `text` with its top-left corner at (`x`, `y`). Pixels outside
    /// the canvas are skipped.
    pub fn draw(&self, canvas: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>, scale: u32) {
        match self {
            LabelFont::Truetype(font) => {
                draw_truetype(font, canvas, x, y, text, color, Self::line_height(scale) as f32)
            }
            LabelFont::Bitmap => draw_bitmap(canvas, x, y, text, color, scale.max(1) as i32),
        }
    }
}

fn put(canvas: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_truetype(font: &Font<'static>, canvas: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>, size: f32) {
    let scale = Scale::uniform(size);
    let ascent = font.v_metrics(scale).ascent;

    for glyph in font.layout(text, scale, point(x as f32, y as f32 + ascent)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            if coverage > COVERAGE_CUTOFF {
                put(canvas, bb.min.x + gx as i32, bb.min.y + gy as i32, color);
            }
        });
    }
}

fn draw_bitmap(canvas: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>, scale: i32) {
    for (i, c) in text.chars().enumerate() {
        let left = x + i as i32 * CELL_WIDTH * scale;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..3i32 {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        put(canvas, left + col * scale + dx, y + row as i32 * scale + dy, color);
                    }
                }
            }
        }
    }
}

/// Rows of a 3x5 glyph, most significant bit leftmost. Case-insensitive;
/// unknown characters are blank.
fn glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        'A' => [2, 5, 7, 5, 5],
        'B' => [6, 5, 6, 5, 6],
        'C' => [7, 4, 4, 4, 7],
        'D' => [6, 5, 5, 5, 6],
        'E' => [7, 4, 6, 4, 7],
        'F' => [7, 4, 6, 4, 4],
        'G' => [7, 4, 5, 5, 7],
        'H' => [5, 5, 7, 5, 5],
        'I' => [7, 2, 2, 2, 7],
        'J' => [1, 1, 1, 5, 7],
        'K' => [5, 5, 6, 5, 5],
        'L' => [4, 4, 4, 4, 7],
        'M' => [5, 7, 7, 5, 5],
        'N' => [6, 5, 5, 5, 5],
        'O' => [7, 5, 5, 5, 7],
        'P' => [7, 5, 7, 4, 4],
        'Q' => [7, 5, 5, 7, 1],
        'R' => [6, 5, 6, 5, 5],
        'S' => [7, 4, 7, 1, 7],
        'T' => [7, 2, 2, 2, 2],
        'U' => [5, 5, 5, 5, 7],
        'V' => [5, 5, 5, 5, 2],
        'W' => [5, 5, 7, 7, 5],
        'X' => [5, 5, 2, 5, 5],
        'Y' => [5, 5, 2, 2, 2],
        'Z' => [7, 1, 2, 4, 7],
        '0' => [7, 5, 5, 5, 7],
        '1' => [2, 6, 2, 2, 7],
        '2' => [7, 1, 7, 4, 7],
        '3' => [7, 1, 7, 1, 7],
        '4' => [5, 5, 7, 1, 1],
        '5' => [7, 4, 7, 1, 7],
        '6' => [7, 4, 7, 5, 7],
        '7' => [7, 1, 2, 4, 4],
        '8' => [7, 5, 7, 5, 7],
        '9' => [7, 5, 7, 1, 7],
        ':' => [0, 2, 0, 2, 0],
        ',' => [0, 0, 0, 2, 4],
        '.' => [0, 0, 0, 0, 2],
        '-' => [0, 0, 7, 0, 0],
        '(' => [1, 2, 2, 2, 1],
        ')' => [4, 2, 2, 2, 4],
        _ => [0; 5],
    }
}
