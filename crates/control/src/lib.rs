//! GazeCursor Control
//!
//! Turns the latest published tracker state into cursor moves, once per
//! tick. The controller reads tracker state without ever waiting for the
//! acquisition worker; a tick with nothing published counts as a miss.

pub mod controller;
pub mod trace;

use std::time::Instant;

use tokio::time::MissedTickBehavior;

use gazecursor_common::clock::SessionClock;
use gazecursor_common::error::GazeError;
use gazecursor_common::shutdown::ShutdownSignal;
use gazecursor_platform_core::CursorDriver;
use gazecursor_tracker::{GazeObservation, StateSubscriber};

pub use controller::{
    motion_delta, ControlState, ControlStats, CursorState, MotionController, RecenterReason,
    TickOutcome,
};
pub use trace::{TickRecord, TraceHeader, TraceWriter};

/// The control worker: a [`MotionController`] driven by a tokio interval.
pub struct ControlLoop<C: CursorDriver> {
    controller: MotionController<C>,
    subscriber: StateSubscriber,
    shutdown: ShutdownSignal,
    clock: SessionClock,
    trace: Option<TraceWriter>,
    trace_errors: u64,
    max_ticks: Option<u64>,
}

impl<C: CursorDriver> ControlLoop<C> {
    pub fn new(
        controller: MotionController<C>,
        subscriber: StateSubscriber,
        shutdown: ShutdownSignal,
        clock: SessionClock,
    ) -> Self {
        Self {
            controller,
            subscriber,
            shutdown,
            clock,
            trace: None,
            trace_errors: 0,
            max_ticks: None,
        }
    }

    /// Record every tick to `writer`.
    pub fn with_trace(mut self, writer: TraceWriter) -> Self {
        self.trace = Some(writer);
        self
    }

    /// Trigger shutdown after `ticks` ticks.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Run until the shutdown signal is triggered. A failing trace is
    /// abandoned; control carries on without it.
    pub async fn run(mut self) -> ControlStats {
        let mut interval = tokio::time::interval(self.controller.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            cursor = self.controller.cursor_name(),
            tick_ms = self.controller.tick_interval().as_millis() as u64,
            "Control loop started"
        );
        self.controller.start();

        while !self.shutdown.is_triggered() {
            interval.tick().await;
            if self.shutdown.is_triggered() {
                break;
            }

            let latest = self.subscriber.latest();
            let observation = latest
                .as_deref()
                .map(GazeObservation::from_state)
                .unwrap_or_else(GazeObservation::absent);

            let now = Instant::now();
            let outcome = self.controller.tick(&observation, now);
            tracing::debug!(
                generation = ?observation.generation,
                state = self.controller.state().as_str(),
                ?outcome,
                "Control tick"
            );

            if let Some(trace) = &mut self.trace {
                let record = TickRecord {
                    tick: self.controller.stats().ticks,
                    t_ms: self.clock.offset_ns(now) / 1_000_000,
                    generation: observation.generation,
                    state: self.controller.state(),
                    outcome,
                    cursor: self.controller.cursor_state().last_committed,
                };
                if let Err(e) = trace.write(&record) {
                    self.abandon_trace(e);
                }
            }

            if self
                .max_ticks
                .is_some_and(|max| self.controller.stats().ticks >= max)
            {
                tracing::info!(ticks = self.controller.stats().ticks, "Tick limit reached");
                self.shutdown.trigger();
            }
        }

        if let Some(trace) = &mut self.trace {
            if let Err(e) = trace.flush() {
                self.abandon_trace(e);
            }
        }
        let mut stats = self.controller.stats();
        stats.trace_errors = self.trace_errors;
        tracing::info!(
            ticks = stats.ticks,
            moves = stats.moves,
            recenters = stats.recenters,
            trace_errors = stats.trace_errors,
            "Control loop stopped"
        );
        stats
    }

    fn abandon_trace(&mut self, error: GazeError) {
        self.trace_errors += 1;
        let path = self.trace.take().map(|t| t.path().display().to_string());
        tracing::warn!(error = %error, path = ?path, "Tick trace failed, continuing without it");
    }
}
