//! The acquisition worker: frames in, published tracker states out.

use std::sync::Arc;
use std::time::Duration;

use image::GrayImage;
use serde::Serialize;

use gazecursor_common::clock::SessionClock;
use gazecursor_common::config::TrackingConfig;
use gazecursor_common::error::GazeResult;
use gazecursor_common::shutdown::ShutdownSignal;
use gazecursor_vision::{
    Calibration, EyeRegion, EyeSide, LandmarkSet, PupilLocation, PupilLocator, TrackedEye,
};

use crate::publish::StatePublisher;
use crate::state::TrackerState;

/// Back-off when a source has no frame ready.
const IDLE_SLEEP: Duration = Duration::from_millis(2);

/// One grayscale camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Position in the source stream, starting at 0.
    pub index: u64,
    pub image: Arc<GrayImage>,
}

impl Frame {
    pub fn new(index: u64, image: GrayImage) -> Self {
        Self {
            index,
            image: Arc::new(image),
        }
    }
}

/// A source of frames (camera, replay directory, synthetic generator).
pub trait FrameSource: Send {
    /// Next frame, or `None` if no frame is available right now.
    fn next_frame(&mut self) -> GazeResult<Option<Frame>>;

    /// True once a finite source has delivered its last frame.
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Source name for logging.
    fn name(&self) -> &str;
}

/// Detects the 68 facial landmarks of the first face in a frame.
pub trait LandmarkProvider: Send {
    fn detect(&mut self, frame: &Frame) -> GazeResult<Option<LandmarkSet>>;

    fn name(&self) -> &str;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> GazeResult<Option<Frame>> {
        (**self).next_frame()
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: LandmarkProvider + ?Sized> LandmarkProvider for Box<T> {
    fn detect(&mut self, frame: &Frame) -> GazeResult<Option<LandmarkSet>> {
        (**self).detect(frame)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Counters reported when the acquisition worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AcquisitionStats {
    pub frames: u64,
    pub faces: u64,
    pub pupils_located: u64,
    pub source_errors: u64,
    pub landmark_errors: u64,
}

/// Per-frame vision pipeline plus calibration state.
///
/// Owned by exactly one thread; it is the only writer of tracker state.
pub struct GazeTracker<P: LandmarkProvider> {
    provider: P,
    calibration: Calibration,
    locator: PupilLocator,
    margin: u32,
    clock: SessionClock,
    generation: u64,
    stats: AcquisitionStats,
}

impl<P: LandmarkProvider> GazeTracker<P> {
    pub fn new(provider: P, config: &TrackingConfig, clock: SessionClock) -> Self {
        Self {
            provider,
            calibration: Calibration::new(config),
            locator: PupilLocator::from_config(config),
            margin: config.crop_margin,
            clock,
            generation: 0,
            stats: AcquisitionStats::default(),
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn stats(&self) -> AcquisitionStats {
        self.stats
    }

    /// Build the tracker state for one frame.
    ///
    /// Landmark provider failures are logged and treated as "no face".
    pub fn refresh(&mut self, frame: &Frame) -> TrackerState {
        self.generation += 1;
        self.stats.frames += 1;

        let mut state = TrackerState::empty(
            self.generation,
            frame.index,
            self.clock.elapsed_ns(),
            Arc::clone(&frame.image),
        );

        let landmarks = match self.provider.detect(frame) {
            Ok(landmarks) => landmarks,
            Err(e) => {
                self.stats.landmark_errors += 1;
                tracing::warn!(frame = frame.index, error = %e, "Landmark detection failed");
                None
            }
        };

        let Some(landmarks) = landmarks else {
            return state;
        };
        self.stats.faces += 1;

        state.left = Some(self.analyze(&frame.image, &landmarks, EyeSide::Left));
        state.right = Some(self.analyze(&frame.image, &landmarks, EyeSide::Right));
        state.head_anchor = Some(landmarks.head_anchor());
        state.landmarks = Some(landmarks);

        if state.pupils_located() {
            self.stats.pupils_located += 1;
        }
        state
    }

    fn analyze(&mut self, image: &GrayImage, landmarks: &LandmarkSet, side: EyeSide) -> TrackedEye {
        let region = EyeRegion::isolate(image, side, landmarks.eye(side), self.margin);

        if !self.calibration.state(side).is_complete() {
            if let Err(e) = self.calibration.evaluate(region.image(), side) {
                tracing::debug!(side = side.as_str(), error = %e, "Calibration sample skipped");
            }
        }

        let pupil = match self.calibration.threshold(side) {
            Some(threshold) => self.locator.locate(region.image(), threshold),
            None => PupilLocation::NotLocated,
        };
        TrackedEye::new(region, pupil)
    }

    /// Pull frames until shutdown (or until a finite source runs dry),
    /// publishing one state per frame. Blocking; run it on its own thread.
    pub fn run<S: FrameSource>(
        mut self,
        mut source: S,
        publisher: StatePublisher,
        shutdown: ShutdownSignal,
    ) -> AcquisitionStats {
        tracing::info!(
            source = source.name(),
            landmarks = self.provider.name(),
            "Acquisition worker started"
        );

        while !shutdown.is_triggered() {
            match source.next_frame() {
                Ok(Some(frame)) => {
                    let state = self.refresh(&frame);
                    tracing::trace!(
                        generation = state.generation,
                        frame = state.frame_index,
                        status = state.status_label(),
                        "Tracker state published"
                    );
                    publisher.publish(state);
                }
                Ok(None) if source.is_exhausted() => {
                    tracing::info!(source = source.name(), "Frame source exhausted");
                    break;
                }
                Ok(None) => std::thread::sleep(IDLE_SLEEP),
                Err(e) => {
                    self.stats.source_errors += 1;
                    tracing::warn!(error = %e, "Frame acquisition error");
                    std::thread::sleep(IDLE_SLEEP);
                }
            }
        }

        tracing::info!(
            frames = self.stats.frames,
            faces = self.stats.faces,
            calibrated = self.calibration.is_complete(),
            "Acquisition worker stopped"
        );
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::state_channel;
    use crate::synthetic::{FacePose, SyntheticFace};
    use gazecursor_common::error::GazeError;
    use image::Luma;

    struct FailingProvider;

    impl LandmarkProvider for FailingProvider {
        fn detect(&mut self, _frame: &Frame) -> GazeResult<Option<LandmarkSet>> {
            Err(GazeError::landmarks("model not loaded"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_provider_failure_is_treated_as_no_face() {
        let mut tracker = GazeTracker::new(FailingProvider, &TrackingConfig::default(), SessionClock::start());
        let frame = Frame::new(0, GrayImage::from_pixel(32, 32, Luma([100])));
        let state = tracker.refresh(&frame);
        assert_eq!(state.generation, 1);
        assert!(!state.face_detected());
        assert_eq!(tracker.stats().landmark_errors, 1);
    }

    #[test]
    fn test_generations_increase_per_frame() {
        let face = SyntheticFace::new(FacePose::default());
        let (_, landmarks) = face.split(Some(3));
        let mut tracker = GazeTracker::new(landmarks, &TrackingConfig::default(), SessionClock::start());

        let first = tracker.refresh(&face.frame(0));
        let second = tracker.refresh(&face.frame(1));
        assert_eq!(first.generation, 1);
        assert_eq!(second.generation, 2);
        assert!(second.timestamp_ns >= first.timestamp_ns);
    }

    #[test]
    fn test_run_stops_when_finite_source_is_exhausted() {
        let face = SyntheticFace::new(FacePose::default());
        let (frames, landmarks) = face.split(Some(4));
        let tracker = GazeTracker::new(landmarks, &TrackingConfig::default(), SessionClock::start());
        let (publisher, subscriber) = state_channel();

        let stats = tracker.run(frames, publisher, ShutdownSignal::new());
        assert_eq!(stats.frames, 4);
        assert_eq!(stats.faces, 4);
        assert_eq!(subscriber.generation(), 4);
    }

    #[test]
    fn test_run_returns_immediately_after_shutdown() {
        let face = SyntheticFace::new(FacePose::default());
        let (frames, landmarks) = face.split(None);
        let tracker = GazeTracker::new(landmarks, &TrackingConfig::default(), SessionClock::start());
        let (publisher, _subscriber) = state_channel();

        let shutdown = ShutdownSignal::new();
        shutdown.trigger();
        assert_eq!(tracker.run(frames, publisher, shutdown).frames, 0);
    }
}
