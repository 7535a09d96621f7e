//! The presentation worker: best-effort display of the latest state.
//!
//! Renderers only read. A slow or failing renderer drops frames; it never
//! delays acquisition or control, and nothing it does flows back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_line_segment_mut,
};
use imageproc::rect::Rect;
use serde::Serialize;

use gazecursor_common::clock::{RateController, SessionClock};
use gazecursor_common::error::GazeResult;
use gazecursor_common::shutdown::ShutdownSignal;
use gazecursor_vision::TrackedEye;

use crate::label::LabelFont;
use crate::publish::StateSubscriber;
use crate::state::{LookDirection, TrackerState};

const IDLE_SLEEP: Duration = Duration::from_millis(2);

const LANDMARK: Rgb<u8> = Rgb([160, 160, 255]);
const EYE: Rgb<u8> = Rgb([0, 200, 255]);
const PUPIL: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT: Rgb<u8> = Rgb([31, 58, 147]);
const STATUS_BAR_HEIGHT: u32 = 6;
const TEXT_MARGIN: i32 = 4;

/// Something that shows a tracker state to the user.
pub trait Renderer: Send {
    fn render(&mut self, state: &TrackerState) -> GazeResult<()>;

    /// Renderer name for logging.
    fn name(&self) -> &str;
}

/// Logs the status label whenever it changes.
#[derive(Debug, Default)]
pub struct StatusLogRenderer {
    last: Option<&'static str>,
}

impl StatusLogRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for StatusLogRenderer {
    fn render(&mut self, state: &TrackerState) -> GazeResult<()> {
        let label = state.status_label();
        if self.last != Some(label) {
            tracing::info!(
                generation = state.generation,
                status = label,
                horizontal = ?state.horizontal_ratio(),
                vertical = ?state.vertical_ratio(),
                "Gaze status"
            );
            self.last = Some(label);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "status-log"
    }
}

/// Writes the annotated frame to a PNG file, replacing it each time.
#[derive(Debug)]
pub struct PngRenderer {
    path: PathBuf,
    tmp_path: PathBuf,
    font: LabelFont,
}

impl PngRenderer {
    /// Labels use the bitmap face until [`PngRenderer::with_font`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tmp_path = path.with_extension("tmp.png");
        Self {
            path,
            tmp_path,
            font: LabelFont::Bitmap,
        }
    }

    pub fn with_font(mut self, font: LabelFont) -> Self {
        self.font = font;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Renderer for PngRenderer {
    fn render(&mut self, state: &TrackerState) -> GazeResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename so viewers never load a half-written file.
        annotate(state, &self.font).save(&self.tmp_path)?;
        std::fs::rename(&self.tmp_path, &self.path)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "png"
    }
}

/// The frame with landmarks, eye outlines, pupil crosshairs, a status
/// bar along the top edge and the status and pupil positions as text.
pub fn annotate(state: &TrackerState, font: &LabelFont) -> RgbImage {
    let mut canvas = DynamicImage::ImageLuma8((*state.frame).clone()).to_rgb8();

    if let Some(landmarks) = &state.landmarks {
        for p in landmarks.points() {
            draw_filled_circle_mut(&mut canvas, (p.x, p.y), 1, LANDMARK);
        }
    }
    for eye in [&state.left, &state.right].into_iter().flatten() {
        draw_eye(&mut canvas, eye);
    }

    if canvas.width() > 0 && canvas.height() > 0 {
        let bar = Rect::at(0, 0).of_size(canvas.width(), STATUS_BAR_HEIGHT.min(canvas.height()));
        draw_filled_rect_mut(&mut canvas, bar, status_color(state));
    }
    draw_labels(&mut canvas, state, font);
    canvas
}

fn draw_labels(canvas: &mut RgbImage, state: &TrackerState, font: &LabelFont) {
    let scale = (canvas.width() / 320).max(1);
    let line = LabelFont::line_height(scale) as i32;
    let mut y = STATUS_BAR_HEIGHT as i32 + 2;

    font.draw(canvas, TEXT_MARGIN, y, &headline(state.status_label()), TEXT, scale);
    y += line + line / 2;
    for (name, eye) in [("Left pupil: ", &state.left), ("Right pupil:", &state.right)] {
        let position = match eye.as_ref().and_then(TrackedEye::pupil_center) {
            Some(p) => format!("({:.0}, {:.0})", p.x, p.y),
            None => "none".to_string(),
        };
        font.draw(canvas, TEXT_MARGIN, y, &format!("{name} {position}"), TEXT, scale);
        y += line;
    }
}

fn headline(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn draw_eye(canvas: &mut RgbImage, eye: &TrackedEye) {
    let center = eye.eye_center();
    draw_hollow_circle_mut(
        canvas,
        (center.x.round() as i32, center.y.round() as i32),
        eye.region.radius().round() as i32,
        EYE,
    );

    if let Some(pupil) = eye.pupil_center() {
        let (x, y) = (pupil.x as f32, pupil.y as f32);
        draw_line_segment_mut(canvas, (x - 5.0, y), (x + 5.0, y), PUPIL);
        draw_line_segment_mut(canvas, (x, y - 5.0), (x, y + 5.0), PUPIL);
    }
}

fn status_color(state: &TrackerState) -> Rgb<u8> {
    if state.is_blinking() == Some(true) {
        return Rgb([255, 220, 0]);
    }
    match state.look_direction() {
        Some(LookDirection::Right) => Rgb([255, 0, 255]),
        Some(LookDirection::Left) => Rgb([0, 255, 255]),
        Some(LookDirection::Center) => Rgb([0, 255, 0]),
        None => Rgb([255, 0, 0]),
    }
}

/// Counters reported when the presentation worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PresentationStats {
    pub renders: u64,
    pub render_errors: u64,
}

/// Renders the latest published state at a bounded rate.
pub struct PresentationWorker {
    renderers: Vec<Box<dyn Renderer>>,
    render_hz: u32,
}

impl PresentationWorker {
    pub fn new(renderers: Vec<Box<dyn Renderer>>, render_hz: u32) -> Self {
        Self {
            renderers,
            render_hz,
        }
    }

    /// Render one state through every renderer. Returns the number of failures.
    pub fn render_once(&mut self, state: &TrackerState) -> u64 {
        let mut failures = 0;
        for renderer in &mut self.renderers {
            if let Err(e) = renderer.render(state) {
                failures += 1;
                tracing::warn!(renderer = renderer.name(), error = %e, "Render failed");
            }
        }
        failures
    }

    /// Render until shutdown. Each generation is rendered at most once;
    /// an empty channel means "nothing to show yet". Blocking.
    pub fn run(mut self, subscriber: StateSubscriber, shutdown: ShutdownSignal) -> PresentationStats {
        let names: Vec<&str> = self.renderers.iter().map(|r| r.name()).collect();
        tracing::info!(renderers = ?names, hz = self.render_hz, "Presentation worker started");

        let clock = SessionClock::start();
        let mut rate = RateController::new(self.render_hz);
        let mut stats = PresentationStats::default();
        let mut last_generation = 0;

        while !shutdown.is_triggered() {
            if !rate.should_tick(clock.elapsed_ns()) {
                std::thread::sleep(IDLE_SLEEP);
                continue;
            }
            let Some(state) = subscriber.latest() else {
                continue;
            };
            if state.generation == last_generation {
                continue;
            }
            last_generation = state.generation;

            stats.render_errors += self.render_once(&state);
            stats.renders += 1;
        }

        tracing::info!(renders = stats.renders, errors = stats.render_errors, "Presentation worker stopped");
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::GazeTracker;
    use crate::publish::state_channel;
    use crate::synthetic::{FacePose, SyntheticFace};
    use gazecursor_common::config::TrackingConfig;
    use gazecursor_common::error::GazeError;
    use gazecursor_vision::PupilLocation;
    use image::GrayImage;
    use std::sync::{Arc, Mutex};

    fn face_state() -> TrackerState {
        let face = SyntheticFace::new(FacePose::default());
        let (_, landmarks) = face.split(None);
        let mut tracker = GazeTracker::new(landmarks, &TrackingConfig::default(), SessionClock::start());
        tracker.refresh(&face.frame(0))
    }

    struct Recording(Arc<Mutex<Vec<u64>>>);

    impl Renderer for Recording {
        fn render(&mut self, state: &TrackerState) -> GazeResult<()> {
            self.0.lock().unwrap().push(state.generation);
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct Broken;

    impl Renderer for Broken {
        fn render(&mut self, _state: &TrackerState) -> GazeResult<()> {
            Err(GazeError::render("display gone"))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn test_annotate_draws_status_bar_and_pupils() {
        let state = face_state();
        assert!(state.pupils_located());
        let canvas = annotate(&state, &LabelFont::Bitmap);
        assert_eq!(canvas.dimensions(), state.frame.dimensions());
        assert_eq!(*canvas.get_pixel(0, 0), Rgb([0, 255, 0]));

        let pupil = state.left.as_ref().unwrap().pupil_center().unwrap();
        let (x, y) = (pupil.x.round() as u32, pupil.y.round() as u32);
        assert!((y - 1..=y + 1).any(|row| *canvas.get_pixel(x + 3, row) == PUPIL));
    }

    #[test]
    fn test_annotate_without_face_marks_status_red() {
        let state = TrackerState::empty(1, 0, 0, Arc::new(GrayImage::new(20, 20)));
        assert_eq!(*annotate(&state, &LabelFont::Bitmap).get_pixel(10, 2), Rgb([255, 0, 0]));
    }

    /// Synthetic face with closed lids and pupils forced to the crop center.
    fn blinking_state() -> TrackerState {
        let face = SyntheticFace::new(FacePose {
            eyes_closed: true,
            ..FacePose::default()
        });
        let (_, landmarks) = face.split(None);
        let mut tracker = GazeTracker::new(landmarks, &TrackingConfig::default(), SessionClock::start());
        let mut state = tracker.refresh(&face.frame(0));
        for eye in [&mut state.left, &mut state.right].into_iter().flatten() {
            let center = eye.region.local_center();
            eye.pupil = PupilLocation::Located {
                x: center.x,
                y: center.y,
            };
        }
        state
    }

    fn label_rows(canvas: &RgbImage) -> Vec<Rgb<u8>> {
        let top = STATUS_BAR_HEIGHT + 2;
        (top..top + LabelFont::line_height(1))
            .flat_map(|y| (0..canvas.width()).map(move |x| (x, y)))
            .map(|(x, y)| *canvas.get_pixel(x, y))
            .collect()
    }

    #[test]
    fn test_status_label_is_written_on_the_frame() {
        let center = face_state();
        let blinking = blinking_state();
        assert_eq!(center.status_label(), "looking center");
        assert_eq!(blinking.status_label(), "blinking");

        let center_rows = label_rows(&annotate(&center, &LabelFont::Bitmap));
        let blinking_rows = label_rows(&annotate(&blinking, &LabelFont::Bitmap));
        assert!(center_rows.contains(&TEXT));
        assert!(blinking_rows.contains(&TEXT));
        assert_ne!(center_rows, blinking_rows);
    }

    #[test]
    fn test_pupil_positions_are_written_below_the_status() {
        let state = face_state();
        let bare = TrackerState::empty(1, 0, 0, Arc::clone(&state.frame));
        let pupil_line = STATUS_BAR_HEIGHT as i32 + 2 + LabelFont::line_height(1) as i32 * 3 / 2;

        let row = |canvas: &RgbImage| -> Vec<Rgb<u8>> {
            (0..canvas.width())
                .map(|x| *canvas.get_pixel(x, pupil_line as u32 + 1))
                .collect()
        };
        // "(52, 60)" versus "none" on the same background.
        assert_ne!(
            row(&annotate(&state, &LabelFont::Bitmap)),
            row(&annotate(&bare, &LabelFont::Bitmap))
        );
    }

    #[test]
    fn test_png_renderer_replaces_file() {
        let dir = std::env::temp_dir().join(format!("gazecursor_png_{}", std::process::id()));
        let path = dir.join("annotated.png");
        let mut renderer = PngRenderer::new(&path);
        renderer.render(&face_state()).unwrap();
        renderer.render(&face_state()).unwrap();

        let written = image::open(&path).unwrap();
        assert_eq!(written.width(), 160);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_failing_renderer_does_not_stop_others() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut worker = PresentationWorker::new(
            vec![Box::new(Broken), Box::new(Recording(seen.clone()))],
            30,
        );
        assert_eq!(worker.render_once(&face_state()), 1);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_worker_renders_each_generation_once_and_stops() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let worker = PresentationWorker::new(vec![Box::new(Recording(seen.clone()))], 200);
        let (publisher, subscriber) = state_channel();
        let shutdown = ShutdownSignal::new();

        let handle = {
            let shutdown = shutdown.clone();
            std::thread::spawn(move || worker.run(subscriber, shutdown))
        };

        std::thread::sleep(Duration::from_millis(30));
        publisher.publish(TrackerState::empty(1, 0, 0, Arc::new(GrayImage::new(4, 4))));
        std::thread::sleep(Duration::from_millis(60));
        shutdown.trigger();

        let stats = handle.join().unwrap();
        assert_eq!(stats.renders, 1);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }
}
