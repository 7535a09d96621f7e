//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GazeError, GazeResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Eye isolation, calibration and pupil localization parameters.
    pub tracking: TrackingConfig,

    /// Motion controller parameters.
    pub control: ControlConfig,

    /// Presentation worker parameters.
    pub presentation: PresentationConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Parameters for the per-frame vision pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Margin (px) added around the eye polygon before cropping.
    pub crop_margin: u32,

    /// Samples per eye before the binarization threshold is frozen.
    pub calibration_samples: usize,

    /// Fraction of the eye interior expected to be dark (pupil + iris).
    pub target_dark_fraction: f64,

    /// First candidate threshold of the calibration scan.
    pub threshold_min: u8,

    /// Exclusive upper bound of the calibration scan.
    pub threshold_max: u8,

    /// Step between candidate thresholds.
    pub threshold_step: u8,

    /// Erosion radius applied to the binarized eye before contour search.
    pub pupil_erosion: u8,

    /// Smallest contour area (px²) accepted as a pupil.
    pub min_pupil_area: f64,

    /// Median filter radius used to denoise the eye before binarization.
    pub noise_radius: u32,
}

/// Parameters for the cursor motion controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Control tick interval in milliseconds.
    pub tick_ms: u64,

    /// Pause after a manual cursor move, in milliseconds.
    pub cooldown_ms: u64,

    /// Consecutive invalid (or blinking) ticks before the cursor is recentered.
    pub max_misses: u32,

    /// Moves at or below this distance (px) from the last position are dropped.
    pub jitter_threshold_px: f64,

    /// Distance (px) kept between the cursor and every screen edge.
    pub edge_inset_px: i32,

    /// Horizontal gain. Negative because the camera mirrors the user.
    pub sensitivity_x: f64,

    /// Vertical gain.
    pub sensitivity_y: f64,

    /// Weight of the horizontal gaze-ratio bias term.
    pub gaze_bias_h: f64,

    /// Weight of the vertical gaze-ratio bias term.
    pub gaze_bias_v: f64,

    /// Ticks a previous snapshot may stand in for an invalid one.
    pub carry_forward_ticks: u32,
}

/// Parameters for the presentation worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// Maximum render rate (Hz).
    pub render_hz: u32,

    /// Where to write the latest annotated frame, if anywhere.
    pub annotated_frame: Option<PathBuf>,

    /// TrueType font for annotated-frame labels. System fonts are searched
    /// when unset; without any, a built-in bitmap face is used.
    pub label_font: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "gazecursor_control=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            crop_margin: 5,
            calibration_samples: 20,
            target_dark_fraction: 0.48,
            threshold_min: 5,
            threshold_max: 100,
            threshold_step: 5,
            pupil_erosion: 1,
            min_pupil_area: 4.0,
            noise_radius: 1,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            cooldown_ms: 3000,
            max_misses: 5,
            jitter_threshold_px: 50.0,
            edge_inset_px: 5,
            sensitivity_x: -30.0,
            sensitivity_y: 50.0,
            gaze_bias_h: 0.0,
            gaze_bias_v: 0.0,
            carry_forward_ticks: 3,
        }
    }
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            render_hz: 15,
            annotated_frame: None,
            label_font: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl TrackingConfig {
    /// Candidate thresholds scanned by the calibration search.
    pub fn threshold_candidates(&self) -> Vec<u8> {
        let step = self.threshold_step.max(1) as usize;
        (self.threshold_min..self.threshold_max)
            .step_by(step)
            .collect()
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Errors are returned, not masked.
    pub fn load_from(path: &Path) -> GazeResult<Self> {
        if !path.exists() {
            return Err(GazeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&config_path, json)?;
        Ok(config_path)
    }

    /// Reject values the workers cannot run with.
    pub fn validate(&self) -> GazeResult<()> {
        if self.tracking.calibration_samples == 0 {
            return Err(GazeError::config("tracking.calibration_samples must be > 0"));
        }
        if self.tracking.threshold_candidates().is_empty() {
            return Err(GazeError::config(
                "tracking threshold scan is empty (threshold_min >= threshold_max)",
            ));
        }
        if self.control.tick_ms == 0 {
            return Err(GazeError::config("control.tick_ms must be > 0"));
        }
        if self.control.max_misses == 0 {
            return Err(GazeError::config("control.max_misses must be > 0"));
        }
        if self.presentation.render_hz == 0 {
            return Err(GazeError::config("presentation.render_hz must be > 0"));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("gazecursor").join("config.json")
}
