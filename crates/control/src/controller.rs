//! The cursor motion state machine.
//!
//! ```text
//!            manual move                 cooldown elapsed
//! TRACKING ─────────────▶ PAUSED_MANUAL ──────────────────▶ TRACKING
//!     │  ▲                  │ ▲ manual move (restarts cooldown)
//!     │  │                  └─┘
//!     │  │ next valid tick
//!     ▼  │
//! RECOVERING ◀── max consecutive misses or blinks (cursor recentered)
//! ```
//!
//! One call to [`MotionController::tick`] is one control step. Time is an
//! argument so the machine can be driven with synthetic instants.

use std::time::{Duration, Instant};

use serde::Serialize;

use gazecursor_common::config::ControlConfig;
use gazecursor_platform_core::{CursorDriver, ScreenPoint, ScreenSize};
use gazecursor_tracker::{CarryForward, Effective, GazeObservation, GazeSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    Tracking,
    Recovering,
    PausedManual,
}

impl ControlState {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlState::Tracking => "tracking",
            ControlState::Recovering => "recovering",
            ControlState::PausedManual => "paused_manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecenterReason {
    Startup,
    NoGaze,
    Blinking,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TickOutcome {
    /// The cursor was commanded to a new position.
    Moved { from: ScreenPoint, to: ScreenPoint },
    /// The candidate move was within the jitter threshold.
    Held { at: ScreenPoint },
    /// First valid snapshot since start or recovery; nothing to compare with.
    Baseline,
    /// The user moved the cursor; control is paused.
    ManualMove { at: ScreenPoint },
    /// Still inside the manual cooldown.
    Paused { remaining_ms: u64 },
    /// No valid gaze this tick.
    Missed { misses: u32 },
    /// Eyes closed this tick.
    Blinking { blinks: u32 },
    Recentered { to: ScreenPoint, reason: RecenterReason },
    /// The cursor position could not be read.
    CursorUnavailable,
}

/// What the controller knows about the cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CursorState {
    /// Where the controller last put (or accepted) the cursor.
    pub last_committed: Option<ScreenPoint>,
    /// Position read at the start of the latest tick.
    pub last_observed: Option<ScreenPoint>,
    pub cooldown_until: Option<Instant>,
    pub no_gaze_misses: u32,
    pub blink_misses: u32,
}

/// Counters reported when the control loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ControlStats {
    pub ticks: u64,
    pub moves: u64,
    pub held: u64,
    pub misses: u64,
    pub manual_pauses: u64,
    pub recenters: u64,
    pub cursor_errors: u64,
    /// Failed trace writes; the trace is dropped after the first.
    pub trace_errors: u64,
}

/// Per-axis displacement from one snapshot to the next.
///
/// The head term averages eye, pupil and anchor displacement; the
/// rotation term compares anchor to eye displacement, so a pure
/// translation contributes half its distance. The gaze bias term
/// weighs how far the average ratio is from center.
pub fn motion_delta(previous: &GazeSnapshot, current: &GazeSnapshot, config: &ControlConfig) -> (i32, i32) {
    let eyes = (
        current.eyes_midpoint().x - previous.eyes_midpoint().x,
        current.eyes_midpoint().y - previous.eyes_midpoint().y,
    );
    let pupils = (
        current.pupils_midpoint().x - previous.pupils_midpoint().x,
        current.pupils_midpoint().y - previous.pupils_midpoint().y,
    );
    let anchor = (
        current.head_anchor.x - previous.head_anchor.x,
        current.head_anchor.y - previous.head_anchor.y,
    );
    let bias_h = (current.h_ratio_left + current.h_ratio_right) / 2.0 - 0.5;
    let bias_v = (current.v_ratio_left + current.v_ratio_right) / 2.0 - 0.5;

    (
        axis_delta(eyes.0, pupils.0, anchor.0, config.gaze_bias_h * bias_h, config.sensitivity_x),
        axis_delta(eyes.1, pupils.1, anchor.1, config.gaze_bias_v * bias_v, config.sensitivity_y),
    )
}

fn axis_delta(eyes: f64, pupils: f64, anchor: f64, bias: f64, sensitivity: f64) -> i32 {
    let head = (eyes + pupils + anchor) / 3.0;
    let rotation = anchor / if eyes != 0.0 { eyes * 2.0 } else { 1.0 };
    // Truncates toward zero; saturates on overflow.
    (sensitivity * (head * rotation + bias)) as i32
}

/// Turns gaze observations into cursor moves.
pub struct MotionController<C: CursorDriver> {
    cursor: C,
    config: ControlConfig,
    screen: ScreenSize,
    state: ControlState,
    cursor_state: CursorState,
    baseline: Option<GazeSnapshot>,
    carry: CarryForward,
    stats: ControlStats,
}

impl<C: CursorDriver> MotionController<C> {
    pub fn new(cursor: C, config: ControlConfig) -> Self {
        let screen = cursor.screen_size();
        let carry = CarryForward::new(config.carry_forward_ticks);
        Self {
            cursor,
            config,
            screen,
            state: ControlState::Tracking,
            cursor_state: CursorState::default(),
            baseline: None,
            carry,
            stats: ControlStats::default(),
        }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn cursor_state(&self) -> &CursorState {
        &self.cursor_state
    }

    pub fn stats(&self) -> ControlStats {
        self.stats
    }

    pub fn screen(&self) -> ScreenSize {
        self.screen
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.config.tick_ms)
    }

    pub fn cursor_name(&self) -> &str {
        self.cursor.name()
    }

    /// Put the cursor at the reference point before the first tick.
    pub fn start(&mut self) -> TickOutcome {
        self.recenter(RecenterReason::Startup)
    }

    /// One control step.
    pub fn tick(&mut self, observation: &GazeObservation, now: Instant) -> TickOutcome {
        self.stats.ticks += 1;

        let observed = match self.cursor.position() {
            Ok(point) => point,
            Err(e) => {
                self.stats.cursor_errors += 1;
                tracing::warn!(error = %e, "Cannot read cursor position");
                return TickOutcome::CursorUnavailable;
            }
        };
        self.cursor_state.last_observed = Some(observed);
        let committed = *self.cursor_state.last_committed.get_or_insert(observed);

        if observed != committed {
            return self.enter_manual_pause(observed, observation, now);
        }

        if self.state == ControlState::PausedManual {
            match self.cursor_state.cooldown_until {
                Some(until) if now < until => {
                    self.baseline = observation.snapshot.complete();
                    return TickOutcome::Paused {
                        remaining_ms: (until - now).as_millis() as u64,
                    };
                }
                _ => {
                    tracing::info!("Manual cooldown over, resuming gaze control");
                    self.cursor_state.cooldown_until = None;
                    self.state = ControlState::Tracking;
                }
            }
        }

        let current = match self.carry.apply(&observation.snapshot, self.baseline.as_ref()) {
            Effective::Fresh(snapshot) => snapshot,
            Effective::Carried(snapshot) => {
                self.baseline = Some(snapshot);
                return self.register_miss();
            }
            Effective::Lost => {
                self.baseline = None;
                return self.register_miss();
            }
        };
        self.cursor_state.no_gaze_misses = 0;

        if self.state == ControlState::Recovering {
            tracing::debug!("Gaze reacquired");
            self.state = ControlState::Tracking;
        }

        if observation.blinking == Some(true) {
            self.cursor_state.blink_misses += 1;
            self.baseline = Some(current);
            if self.cursor_state.blink_misses >= self.config.max_misses {
                return self.recenter(RecenterReason::Blinking);
            }
            return TickOutcome::Blinking {
                blinks: self.cursor_state.blink_misses,
            };
        }
        self.cursor_state.blink_misses = 0;

        let Some(previous) = self.baseline.replace(current) else {
            return TickOutcome::Baseline;
        };

        let (dx, dy) = motion_delta(&previous, &current, &self.config);
        let candidate = self
            .screen
            .clamp_inset(observed.offset(dx, dy), self.config.edge_inset_px);
        let target = if candidate.distance_to(committed) <= self.config.jitter_threshold_px {
            committed
        } else {
            candidate
        };

        if let Err(e) = self.cursor.move_to(target) {
            self.stats.cursor_errors += 1;
            tracing::warn!(error = %e, x = target.x, y = target.y, "Cursor move failed");
        }
        self.cursor_state.last_committed = Some(target);

        if target == committed {
            self.stats.held += 1;
            TickOutcome::Held { at: target }
        } else {
            self.stats.moves += 1;
            tracing::trace!(dx, dy, x = target.x, y = target.y, "Cursor moved");
            TickOutcome::Moved {
                from: committed,
                to: target,
            }
        }
    }

    fn enter_manual_pause(&mut self, observed: ScreenPoint, observation: &GazeObservation, now: Instant) -> TickOutcome {
        if self.state == ControlState::PausedManual {
            tracing::debug!(x = observed.x, y = observed.y, "Manual move during cooldown, restarting it");
        } else {
            tracing::info!(
                x = observed.x,
                y = observed.y,
                cooldown_ms = self.config.cooldown_ms,
                "Manual cursor move, pausing gaze control"
            );
            self.stats.manual_pauses += 1;
        }

        self.state = ControlState::PausedManual;
        self.cursor_state.last_committed = Some(observed);
        self.cursor_state.cooldown_until = Some(now + Duration::from_millis(self.config.cooldown_ms));
        self.cursor_state.no_gaze_misses = 0;
        self.cursor_state.blink_misses = 0;
        self.baseline = observation.snapshot.complete();
        self.carry.reset();
        TickOutcome::ManualMove { at: observed }
    }

    fn register_miss(&mut self) -> TickOutcome {
        self.stats.misses += 1;
        self.cursor_state.no_gaze_misses += 1;
        if self.cursor_state.no_gaze_misses >= self.config.max_misses {
            return self.recenter(RecenterReason::NoGaze);
        }
        TickOutcome::Missed {
            misses: self.cursor_state.no_gaze_misses,
        }
    }

    fn recenter(&mut self, reason: RecenterReason) -> TickOutcome {
        let center = self.screen.center();
        if let Err(e) = self.cursor.move_to(center) {
            self.stats.cursor_errors += 1;
            tracing::warn!(error = %e, "Cursor recenter failed");
        }
        if reason != RecenterReason::Startup {
            tracing::info!(?reason, x = center.x, y = center.y, "Recentering cursor");
            self.stats.recenters += 1;
        }

        self.state = if reason == RecenterReason::Startup {
            ControlState::Tracking
        } else {
            ControlState::Recovering
        };
        self.cursor_state.last_committed = Some(center);
        self.cursor_state.cooldown_until = None;
        self.cursor_state.no_gaze_misses = 0;
        self.cursor_state.blink_misses = 0;
        self.baseline = None;
        self.carry.reset();
        TickOutcome::Recentered { to: center, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazecursor_common::error::{GazeError, GazeResult};
    use gazecursor_cursor_driver::{VirtualCursor, VirtualCursorHandle};
    use gazecursor_tracker::PartialSnapshot;
    use gazecursor_vision::Point2D;

    /// A face translated by (x, y) with centered pupils.
    fn face_at(x: f64, y: f64) -> GazeSnapshot {
        GazeSnapshot {
            eye_left: Point2D::new(52.0 + x, 60.0 + y),
            eye_right: Point2D::new(108.0 + x, 60.0 + y),
            pupil_left: Point2D::new(52.0 + x, 60.0 + y),
            pupil_right: Point2D::new(108.0 + x, 60.0 + y),
            h_ratio_left: 0.5,
            h_ratio_right: 0.5,
            v_ratio_left: 0.5,
            v_ratio_right: 0.5,
            head_anchor: Point2D::new(80.0 + x, 80.0 + y),
        }
    }

    fn controller(screen: ScreenSize) -> (MotionController<VirtualCursor>, VirtualCursorHandle) {
        let cursor = VirtualCursor::new(screen);
        let handle = cursor.handle();
        let mut controller = MotionController::new(cursor, ControlConfig::default());
        controller.start();
        (controller, handle)
    }

    fn at(t0: Instant, ms: u64) -> Instant {
        t0 + Duration::from_millis(ms)
    }

    #[test]
    fn test_translation_contributes_half_its_distance() {
        let config = ControlConfig::default();
        // x: -30 * 4/2, y: 50 * 2/2
        assert_eq!(motion_delta(&face_at(0.0, 0.0), &face_at(4.0, 2.0), &config), (-60, 50));
        assert_eq!(motion_delta(&face_at(0.0, 0.0), &face_at(0.0, 0.0), &config), (0, 0));
    }

    #[test]
    fn test_anchor_only_motion_uses_unit_divisor() {
        let config = ControlConfig::default();
        let mut moved = face_at(0.0, 0.0);
        moved.head_anchor.x += 3.0;
        // head 1.0, rotation 3.0 / 1 -> -30 * 3
        assert_eq!(motion_delta(&face_at(0.0, 0.0), &moved, &config), (-90, 0));
    }

    #[test]
    fn test_delta_is_truncated_toward_zero() {
        let config = ControlConfig::default();
        // -30 * 0.5 / 2 = -7.5 -> -7
        assert_eq!(motion_delta(&face_at(0.0, 0.0), &face_at(0.5, 0.0), &config).0, -7);
    }

    #[test]
    fn test_gaze_bias_is_off_by_default() {
        let mut config = ControlConfig::default();
        let mut looking = face_at(0.0, 0.0);
        looking.h_ratio_left = 0.9;
        looking.h_ratio_right = 0.9;
        assert_eq!(motion_delta(&face_at(0.0, 0.0), &looking, &config), (0, 0));

        config.gaze_bias_h = 1.0;
        // -30 * 0.4
        assert_eq!(motion_delta(&face_at(0.0, 0.0), &looking, &config).0, -12);
    }

    #[test]
    fn test_start_recenters_into_tracking() {
        let (controller, handle) = controller(ScreenSize::new(1920, 1080));
        assert_eq!(handle.position(), ScreenPoint::new(960, 540));
        assert_eq!(controller.state(), ControlState::Tracking);
        assert_eq!(controller.stats().recenters, 0);
    }

    #[test]
    fn test_first_valid_tick_only_records_baseline() {
        let (mut controller, handle) = controller(ScreenSize::new(1920, 1080));
        let t0 = Instant::now();
        let moves_before = handle.move_count();

        assert_eq!(controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), t0), TickOutcome::Baseline);
        assert_eq!(handle.move_count(), moves_before);
    }

    #[test]
    fn test_large_delta_moves_by_exact_amount() {
        let (mut controller, handle) = controller(ScreenSize::new(1920, 1080));
        let t0 = Instant::now();
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), t0);

        let outcome = controller.tick(&GazeObservation::of(face_at(4.0, 0.0)), at(t0, 50));
        assert_eq!(
            outcome,
            TickOutcome::Moved {
                from: ScreenPoint::new(960, 540),
                to: ScreenPoint::new(900, 540)
            }
        );
        assert_eq!(handle.position(), ScreenPoint::new(900, 540));
        assert_eq!(controller.cursor_state().last_committed, Some(ScreenPoint::new(900, 540)));
    }

    #[test]
    fn test_small_delta_within_jitter_holds_position() {
        let (mut controller, handle) = controller(ScreenSize::new(1920, 1080));
        let t0 = Instant::now();
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), t0);
        let moves_before = handle.move_count();

        // -30 * 3 / 2 = -45: inside the 50px threshold.
        let outcome = controller.tick(&GazeObservation::of(face_at(3.0, 0.0)), at(t0, 50));
        assert_eq!(outcome, TickOutcome::Held { at: ScreenPoint::new(960, 540) });
        assert_eq!(handle.position(), ScreenPoint::new(960, 540));
        // The move is still commanded, to the committed position.
        assert_eq!(handle.move_count(), moves_before + 1);
    }

    /// Controller whose x gain turns a 4px head translation into
    /// exactly `-distance` pixels.
    fn controller_with_step(distance: f64) -> (MotionController<VirtualCursor>, VirtualCursorHandle) {
        let cursor = VirtualCursor::new(ScreenSize::new(1920, 1080));
        let handle = cursor.handle();
        let config = ControlConfig {
            sensitivity_x: -distance / 2.0,
            ..ControlConfig::default()
        };
        let mut controller = MotionController::new(cursor, config);
        controller.start();
        (controller, handle)
    }

    #[test]
    fn test_jitter_threshold_is_inclusive() {
        let config = ControlConfig {
            sensitivity_x: -25.0,
            ..ControlConfig::default()
        };
        assert_eq!(motion_delta(&face_at(0.0, 0.0), &face_at(4.0, 0.0), &config), (-50, 0));

        let (mut controller, handle) = controller_with_step(50.0);
        let t0 = Instant::now();
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), t0);
        let outcome = controller.tick(&GazeObservation::of(face_at(4.0, 0.0)), at(t0, 50));
        assert_eq!(outcome, TickOutcome::Held { at: ScreenPoint::new(960, 540) });
        assert_eq!(handle.position(), ScreenPoint::new(960, 540));
    }

    #[test]
    fn test_one_pixel_past_jitter_threshold_moves() {
        let config = ControlConfig {
            sensitivity_x: -25.5,
            ..ControlConfig::default()
        };
        assert_eq!(motion_delta(&face_at(0.0, 0.0), &face_at(4.0, 0.0), &config), (-51, 0));

        let (mut controller, handle) = controller_with_step(51.0);
        let t0 = Instant::now();
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), t0);
        let outcome = controller.tick(&GazeObservation::of(face_at(4.0, 0.0)), at(t0, 50));
        assert_eq!(
            outcome,
            TickOutcome::Moved {
                from: ScreenPoint::new(960, 540),
                to: ScreenPoint::new(909, 540)
            }
        );
        assert_eq!(handle.position(), ScreenPoint::new(909, 540));
    }

    #[test]
    fn test_moves_are_clamped_to_edge_inset() {
        let (mut controller, handle) = controller(ScreenSize::new(200, 200));
        let t0 = Instant::now();
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), t0);

        // -30 * 8 / 2 = -120 from x=100 -> -20, clamped to 5.
        controller.tick(&GazeObservation::of(face_at(8.0, 0.0)), at(t0, 50));
        assert_eq!(handle.position(), ScreenPoint::new(5, 100));

        // 50 * 12 / 2 = 300 down from y=100 -> clamped to 195.
        controller.tick(&GazeObservation::of(face_at(8.0, 12.0)), at(t0, 100));
        assert_eq!(handle.position(), ScreenPoint::new(5, 195));
    }

    #[test]
    fn test_consecutive_misses_recenter_and_reset_counters() {
        let (mut controller, handle) = controller(ScreenSize::new(1920, 1080));
        let t0 = Instant::now();
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), t0);
        controller.tick(&GazeObservation::of(face_at(6.0, 0.0)), at(t0, 50));
        assert_eq!(handle.position(), ScreenPoint::new(870, 540));

        for i in 1..5 {
            let outcome = controller.tick(&GazeObservation::absent(), at(t0, 50 + 50 * i as u64));
            assert_eq!(outcome, TickOutcome::Missed { misses: i });
        }
        let outcome = controller.tick(&GazeObservation::absent(), at(t0, 300));
        assert_eq!(
            outcome,
            TickOutcome::Recentered {
                to: ScreenPoint::new(960, 540),
                reason: RecenterReason::NoGaze
            }
        );
        assert_eq!(handle.position(), ScreenPoint::new(960, 540));
        assert_eq!(controller.state(), ControlState::Recovering);
        assert_eq!(controller.cursor_state().no_gaze_misses, 0);
        assert_eq!(controller.cursor_state().blink_misses, 0);

        // Recovery ends on the next valid tick, which re-baselines.
        let outcome = controller.tick(&GazeObservation::of(face_at(30.0, 0.0)), at(t0, 350));
        assert_eq!(outcome, TickOutcome::Baseline);
        assert_eq!(controller.state(), ControlState::Tracking);
    }

    #[test]
    fn test_valid_tick_resets_miss_counter() {
        let (mut controller, _handle) = controller(ScreenSize::new(1920, 1080));
        let t0 = Instant::now();
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), t0);
        for i in 1..=4 {
            controller.tick(&GazeObservation::absent(), at(t0, 50 * i));
        }
        assert_eq!(controller.cursor_state().no_gaze_misses, 4);
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), at(t0, 250));
        assert_eq!(controller.cursor_state().no_gaze_misses, 0);
        assert_eq!(controller.stats().recenters, 0);
    }

    #[test]
    fn test_partial_capture_carries_baseline_forward() {
        let (mut controller, handle) = controller(ScreenSize::new(1920, 1080));
        let t0 = Instant::now();
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), t0);

        let mut partial = PartialSnapshot::from(face_at(0.0, 0.0));
        partial.pupil_right = None;
        let observation = GazeObservation {
            generation: None,
            snapshot: partial,
            blinking: None,
        };
        assert_eq!(controller.tick(&observation, at(t0, 50)), TickOutcome::Missed { misses: 1 });

        // Delta is measured against the carried snapshot.
        controller.tick(&GazeObservation::of(face_at(4.0, 0.0)), at(t0, 100));
        assert_eq!(handle.position(), ScreenPoint::new(900, 540));
    }

    #[test]
    fn test_carry_horizon_expiry_drops_baseline() {
        let (mut controller, handle) = controller(ScreenSize::new(1920, 1080));
        let t0 = Instant::now();
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), t0);
        // Three carried ticks, then the fourth is lost.
        for i in 1..=4 {
            controller.tick(&GazeObservation::absent(), at(t0, 50 * i));
        }
        let outcome = controller.tick(&GazeObservation::of(face_at(20.0, 0.0)), at(t0, 250));
        assert_eq!(outcome, TickOutcome::Baseline);
        assert_eq!(handle.position(), ScreenPoint::new(960, 540));
    }

    #[test]
    fn test_manual_move_pauses_for_cooldown() {
        let (mut controller, handle) = controller(ScreenSize::new(1920, 1080));
        let t0 = Instant::now();
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), t0);

        handle.set_position(ScreenPoint::new(300, 300));
        let outcome = controller.tick(&GazeObservation::of(face_at(8.0, 0.0)), at(t0, 50));
        assert_eq!(outcome, TickOutcome::ManualMove { at: ScreenPoint::new(300, 300) });
        assert_eq!(controller.state(), ControlState::PausedManual);

        let moves_before = handle.move_count();
        let outcome = controller.tick(&GazeObservation::of(face_at(16.0, 0.0)), at(t0, 1050));
        assert_eq!(outcome, TickOutcome::Paused { remaining_ms: 2000 });
        assert_eq!(handle.position(), ScreenPoint::new(300, 300));
        assert_eq!(handle.move_count(), moves_before);

        // After the cooldown the delta is taken from the last paused tick.
        let outcome = controller.tick(&GazeObservation::of(face_at(24.0, 0.0)), at(t0, 3100));
        assert_eq!(
            outcome,
            TickOutcome::Moved {
                from: ScreenPoint::new(300, 300),
                to: ScreenPoint::new(180, 300)
            }
        );
        assert_eq!(controller.state(), ControlState::Tracking);
        assert_eq!(controller.stats().manual_pauses, 1);
    }

    #[test]
    fn test_manual_move_during_cooldown_restarts_it() {
        let (mut controller, handle) = controller(ScreenSize::new(1920, 1080));
        let t0 = Instant::now();
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), t0);

        handle.set_position(ScreenPoint::new(300, 300));
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), at(t0, 50));
        handle.set_position(ScreenPoint::new(400, 400));
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), at(t0, 2050));

        // 3050ms is past the first deadline but not the restarted one.
        let outcome = controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), at(t0, 3050));
        assert_eq!(outcome, TickOutcome::Paused { remaining_ms: 2000 });
        assert_eq!(controller.stats().manual_pauses, 1);
    }

    #[test]
    fn test_blinking_never_moves_and_eventually_recenters() {
        let (mut controller, handle) = controller(ScreenSize::new(1920, 1080));
        let t0 = Instant::now();
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), t0);
        let moves_before = handle.move_count();

        let blink = |x: f64| GazeObservation {
            blinking: Some(true),
            ..GazeObservation::of(face_at(x, 0.0))
        };
        for i in 1..5u32 {
            let outcome = controller.tick(&blink(10.0 * i as f64), at(t0, 50 * i as u64));
            assert_eq!(outcome, TickOutcome::Blinking { blinks: i });
        }
        assert_eq!(handle.move_count(), moves_before);

        let outcome = controller.tick(&blink(50.0), at(t0, 250));
        assert!(matches!(
            outcome,
            TickOutcome::Recentered {
                reason: RecenterReason::Blinking,
                ..
            }
        ));
        assert_eq!(controller.cursor_state().blink_misses, 0);
    }

    #[test]
    fn test_open_eyes_reset_blink_counter() {
        let (mut controller, _handle) = controller(ScreenSize::new(1920, 1080));
        let t0 = Instant::now();
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), t0);
        let blink = GazeObservation {
            blinking: Some(true),
            ..GazeObservation::of(face_at(0.0, 0.0))
        };
        controller.tick(&blink, at(t0, 50));
        controller.tick(&blink, at(t0, 100));
        assert_eq!(controller.cursor_state().blink_misses, 2);
        controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), at(t0, 150));
        assert_eq!(controller.cursor_state().blink_misses, 0);
    }

    struct UnreadableCursor;

    impl CursorDriver for UnreadableCursor {
        fn position(&mut self) -> GazeResult<ScreenPoint> {
            Err(GazeError::cursor("display connection lost"))
        }

        fn move_to(&mut self, _point: ScreenPoint) -> GazeResult<()> {
            Err(GazeError::cursor("display connection lost"))
        }

        fn screen_size(&self) -> ScreenSize {
            ScreenSize::default()
        }

        fn name(&self) -> &str {
            "unreadable"
        }
    }

    #[test]
    fn test_unreadable_cursor_skips_tick() {
        let mut controller = MotionController::new(UnreadableCursor, ControlConfig::default());
        controller.start();
        let outcome = controller.tick(&GazeObservation::of(face_at(0.0, 0.0)), Instant::now());
        assert_eq!(outcome, TickOutcome::CursorUnavailable);
        assert_eq!(controller.stats().cursor_errors, 2);
    }
}
