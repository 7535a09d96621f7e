//! A gaze-control session.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use gazecursor_common::clock::SessionClock;
use gazecursor_common::config::AppConfig;
use gazecursor_common::error::{GazeError, GazeResult};
use gazecursor_common::shutdown::ShutdownSignal;
use gazecursor_control::{ControlLoop, ControlStats, MotionController, TraceHeader, TraceWriter};
use gazecursor_platform_core::CursorDriver;
use gazecursor_tracker::presentation::PresentationStats;
use gazecursor_tracker::{
    state_channel, AcquisitionStats, FrameSource, GazeTracker, LandmarkProvider,
    PresentationWorker, Renderer,
};

/// How often [`GazeSession::wait`] checks the shutdown signal.
const WAIT_POLL: Duration = Duration::from_millis(20);

/// Session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not yet started.
    Idle,
    /// Workers running.
    Running,
    /// Workers joined.
    Stopped,
}

/// Collaborators handed to a session at start.
pub struct SessionInputs {
    pub frames: Box<dyn FrameSource>,
    pub landmarks: Box<dyn LandmarkProvider>,
    pub cursor: Box<dyn CursorDriver>,
    pub renderers: Vec<Box<dyn Renderer>>,
}

/// Session behaviour beyond the application config.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Trigger shutdown once a finite frame source runs dry.
    pub exit_when_source_ends: bool,

    /// Trigger shutdown after this many control ticks.
    pub max_ticks: Option<u64>,

    /// Write a JSONL tick trace here.
    pub trace_path: Option<PathBuf>,
}

/// Final counters of every worker.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SessionReport {
    pub duration_secs: f64,
    pub acquisition: AcquisitionStats,
    pub control: ControlStats,
    pub presentation: PresentationStats,
}

/// Coordinates the acquisition, control and presentation workers.
pub struct GazeSession {
    config: AppConfig,
    options: SessionOptions,
    state: SessionState,
    shutdown: ShutdownSignal,
    clock: Option<SessionClock>,
    acquisition_task: Option<JoinHandle<AcquisitionStats>>,
    control_task: Option<JoinHandle<ControlStats>>,
    presentation_task: Option<JoinHandle<PresentationStats>>,
}

impl GazeSession {
    pub fn new(config: AppConfig, options: SessionOptions) -> Self {
        Self {
            config,
            options,
            state: SessionState::Idle,
            shutdown: ShutdownSignal::new(),
            clock: None,
            acquisition_task: None,
            control_task: None,
            presentation_task: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The signal every worker of this session observes.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Spawn the three workers. Must be called inside a tokio runtime.
    pub fn start(&mut self, inputs: SessionInputs) -> GazeResult<()> {
        if self.state != SessionState::Idle {
            return Err(GazeError::unsupported("session already started"));
        }
        self.config.validate()?;

        let SessionInputs {
            frames,
            landmarks,
            cursor,
            renderers,
        } = inputs;

        let clock = SessionClock::start();
        tracing::info!(
            epoch_wall = %clock.epoch_wall(),
            source = frames.name(),
            landmarks = landmarks.name(),
            cursor = cursor.name(),
            "Starting gaze session"
        );

        // Fallible setup first, so a failure leaves nothing running.
        let trace = match &self.options.trace_path {
            Some(path) => {
                let header = TraceHeader::new(
                    clock.epoch_wall(),
                    cursor.screen_size(),
                    self.config.control.tick_ms,
                    cursor.name(),
                );
                let writer = TraceWriter::create(path, &header)?;
                tracing::info!(path = %path.display(), "Tick trace enabled");
                Some(writer)
            }
            None => None,
        };

        let (publisher, subscriber) = state_channel();

        let tracker = GazeTracker::new(landmarks, &self.config.tracking, clock.clone());
        let shutdown = self.shutdown.clone();
        let exit_when_source_ends = self.options.exit_when_source_ends;
        self.acquisition_task = Some(tokio::task::spawn_blocking(move || {
            let stats = tracker.run(frames, publisher, shutdown.clone());
            if exit_when_source_ends && !shutdown.is_triggered() {
                tracing::info!("Frame source finished, ending session");
                shutdown.trigger();
            }
            stats
        }));

        let mut control = ControlLoop::new(
            MotionController::new(cursor, self.config.control.clone()),
            subscriber.clone(),
            self.shutdown.clone(),
            clock.clone(),
        );
        if let Some(writer) = trace {
            control = control.with_trace(writer);
        }
        if let Some(max) = self.options.max_ticks {
            control = control.with_max_ticks(max);
        }
        self.control_task = Some(tokio::spawn(control.run()));

        let presentation = PresentationWorker::new(renderers, self.config.presentation.render_hz);
        let shutdown = self.shutdown.clone();
        self.presentation_task = Some(tokio::task::spawn_blocking(move || {
            presentation.run(subscriber, shutdown)
        }));

        self.clock = Some(clock);
        self.state = SessionState::Running;
        tracing::info!("Gaze session started");
        Ok(())
    }

    /// Resolve once something triggers shutdown (a worker, a signal
    /// handler, or [`GazeSession::stop`] from elsewhere).
    pub async fn wait(&self) {
        while !self.shutdown.is_triggered() {
            tokio::time::sleep(WAIT_POLL).await;
        }
    }

    /// Trigger shutdown and join all workers.
    ///
    /// Every worker is joined even if one failed; the first failure is
    /// returned after the rest have stopped.
    pub async fn stop(&mut self) -> GazeResult<SessionReport> {
        if self.state != SessionState::Running {
            return Err(GazeError::unsupported("session not running"));
        }
        tracing::info!("Stopping gaze session");
        self.shutdown.trigger();

        let mut report = SessionReport::default();
        let mut first_error: Option<GazeError> = None;

        if let Some(handle) = self.acquisition_task.take() {
            match handle.await {
                Ok(stats) => report.acquisition = stats,
                Err(e) => record(&mut first_error, join_error("acquisition", e)),
            }
        }
        if let Some(handle) = self.control_task.take() {
            match handle.await {
                Ok(stats) => report.control = stats,
                Err(e) => record(&mut first_error, join_error("control", e)),
            }
        }
        if let Some(handle) = self.presentation_task.take() {
            match handle.await {
                Ok(stats) => report.presentation = stats,
                Err(e) => record(&mut first_error, join_error("presentation", e)),
            }
        }

        report.duration_secs = self.clock.as_ref().map(|c| c.elapsed_secs()).unwrap_or(0.0);
        self.state = SessionState::Stopped;
        tracing::info!(
            duration_secs = report.duration_secs,
            frames = report.acquisition.frames,
            ticks = report.control.ticks,
            moves = report.control.moves,
            renders = report.presentation.renders,
            "Gaze session stopped"
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

impl Drop for GazeSession {
    fn drop(&mut self) {
        // Detached workers still observe the signal and wind down.
        self.shutdown.trigger();
    }
}

fn record(slot: &mut Option<GazeError>, error: GazeError) {
    if slot.is_none() {
        *slot = Some(error);
    }
}

fn join_error(worker: &str, error: tokio::task::JoinError) -> GazeError {
    GazeError::Other(anyhow::anyhow!("{worker} worker panicked or was cancelled: {error}"))
}
