//! GazeCursor Tracker
//!
//! The acquisition side of the pipeline and everything readers see of it:
//!
//! - **Acquisition:** pulls frames, asks the landmark provider for a face,
//!   isolates both eyes, feeds calibration and locates pupils
//! - **State:** one immutable [`TrackerState`] per frame, published through
//!   a single-writer watch channel; readers always get a whole generation
//! - **Snapshots:** the 14-value [`GazeSnapshot`] the controller consumes,
//!   with a bounded carry-forward policy for dropped frames
//! - **Presentation:** best-effort renderers that never feed back
//! - **Sources:** JSONL replay and a synthetic face for headless runs

pub mod acquisition;
pub mod label;
pub mod presentation;
pub mod publish;
pub mod replay;
pub mod snapshot;
pub mod state;
pub mod synthetic;

pub use acquisition::{AcquisitionStats, Frame, FrameSource, GazeTracker, LandmarkProvider};
pub use label::LabelFont;
pub use presentation::{
    annotate, PngRenderer, PresentationStats, PresentationWorker, Renderer, StatusLogRenderer,
};
pub use publish::{state_channel, StatePublisher, StateSubscriber};
pub use replay::{ReplayManifest, ReplayRecorder};
pub use snapshot::{CarryForward, Effective, GazeObservation, GazeSnapshot, PartialSnapshot};
pub use state::{LookDirection, TrackerState};
