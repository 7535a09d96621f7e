//! Adaptive binarization threshold search.
//!
//! Each eye collects one "best threshold" per frame until it has
//! `calibration_samples` of them; the mean is then frozen for the rest of
//! the session. The best threshold of a frame is the candidate whose
//! opened, binarized eye interior is closest to the target dark fraction.

use image::GrayImage;

use gazecursor_common::config::TrackingConfig;
use gazecursor_common::error::{GazeError, GazeResult};

use crate::binarize;
use crate::landmarks::EyeSide;

/// Calibration progress for one eye.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationState {
    history: Vec<u8>,
    frozen: Option<u8>,
    target: usize,
}

impl CalibrationState {
    fn new(target: usize) -> Self {
        Self {
            history: Vec::with_capacity(target),
            frozen: None,
            target,
        }
    }

    pub fn samples(&self) -> usize {
        self.history.len()
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn history(&self) -> &[u8] {
        &self.history
    }

    pub fn is_complete(&self) -> bool {
        self.frozen.is_some()
    }

    /// The frozen threshold once complete, otherwise the running mean of
    /// the samples so far. `None` before the first sample.
    pub fn threshold(&self) -> Option<u8> {
        self.frozen.or_else(|| mean_threshold(&self.history))
    }

    fn record(&mut self, best: u8) {
        self.history.push(best);
        if self.history.len() >= self.target {
            self.frozen = mean_threshold(&self.history);
        }
    }
}

/// Per-eye threshold calibration.
#[derive(Debug, Clone)]
pub struct Calibration {
    candidates: Vec<u8>,
    target_fraction: f64,
    margin: u32,
    noise_radius: u32,
    left: CalibrationState,
    right: CalibrationState,
}

impl Calibration {
    pub fn new(config: &TrackingConfig) -> Self {
        let target = config.calibration_samples.max(1);
        Self {
            candidates: config.threshold_candidates(),
            target_fraction: config.target_dark_fraction,
            margin: config.crop_margin,
            noise_radius: config.noise_radius,
            left: CalibrationState::new(target),
            right: CalibrationState::new(target),
        }
    }

    /// Add one sample for `side`. Fails once that side has converged.
    ///
    /// Returns the best threshold found for this frame.
    pub fn evaluate(&mut self, eye: &GrayImage, side: EyeSide) -> GazeResult<u8> {
        if self.state(side).is_complete() {
            return Err(GazeError::calibration(format!(
                "{} eye calibration already converged",
                side.as_str()
            )));
        }

        let best = self.find_best_threshold(eye)?;
        let state = self.state_mut(side);
        state.record(best);

        if let Some(frozen) = state.frozen {
            tracing::info!(
                side = side.as_str(),
                threshold = frozen,
                samples = state.samples(),
                "Calibration converged"
            );
        } else {
            tracing::trace!(side = side.as_str(), best, samples = state.samples(), "Calibration sample");
        }
        Ok(best)
    }

    /// True once both eyes have converged.
    pub fn is_complete(&self) -> bool {
        self.left.is_complete() && self.right.is_complete()
    }

    /// Threshold to binarize `side` with (frozen or in-progress).
    pub fn threshold(&self, side: EyeSide) -> Option<u8> {
        self.state(side).threshold()
    }

    pub fn state(&self, side: EyeSide) -> &CalibrationState {
        match side {
            EyeSide::Left => &self.left,
            EyeSide::Right => &self.right,
        }
    }

    fn state_mut(&mut self, side: EyeSide) -> &mut CalibrationState {
        match side {
            EyeSide::Left => &mut self.left,
            EyeSide::Right => &mut self.right,
        }
    }

    /// Scan the candidates; ties go to the lowest threshold.
    fn find_best_threshold(&self, eye: &GrayImage) -> GazeResult<u8> {
        if eye.width() == 0 || eye.height() == 0 {
            return Err(GazeError::calibration("empty eye crop"));
        }
        let smoothed = binarize::denoise(eye, self.noise_radius);

        let mut best: Option<(u8, f64)> = None;
        for &candidate in &self.candidates {
            let opened = binarize::open(&binarize::binarize(&smoothed, candidate));
            let error = (binarize::dark_fraction(&opened, self.margin) - self.target_fraction).abs();
            if best.map_or(true, |(_, e)| error < e) {
                best = Some((candidate, error));
            }
        }
        best.map(|(t, _)| t)
            .ok_or_else(|| GazeError::calibration("no candidate thresholds configured"))
    }
}

fn mean_threshold(history: &[u8]) -> Option<u8> {
    if history.is_empty() {
        return None;
    }
    let sum: u32 = history.iter().map(|&t| t as u32).sum();
    Some((sum as f64 / history.len() as f64).round() as u8)
}
