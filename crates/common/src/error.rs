//! Error types shared across GazeCursor crates.
//!
//! Only start-up and collaborator failures are errors. A missing face,
//! an unlocated pupil, or an undefined ratio are ordinary `Option` values
//! and never pass through this type.

use std::path::PathBuf;

/// Top-level error type for GazeCursor operations.
#[derive(Debug, thiserror::Error)]
pub enum GazeError {
    #[error("Landmark provider error: {message}")]
    Landmarks { message: String },

    #[error("Frame source error: {message}")]
    FrameSource { message: String },

    #[error("Calibration error: {message}")]
    Calibration { message: String },

    #[error("Cursor error: {message}")]
    Cursor { message: String },

    #[error("Replay error: {message}")]
    Replay { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using GazeError.
pub type GazeResult<T> = Result<T, GazeError>;

impl GazeError {
    pub fn landmarks(msg: impl Into<String>) -> Self {
        Self::Landmarks {
            message: msg.into(),
        }
    }

    pub fn frame_source(msg: impl Into<String>) -> Self {
        Self::FrameSource {
            message: msg.into(),
        }
    }

    pub fn calibration(msg: impl Into<String>) -> Self {
        Self::Calibration {
            message: msg.into(),
        }
    }

    pub fn cursor(msg: impl Into<String>) -> Self {
        Self::Cursor {
            message: msg.into(),
        }
    }

    pub fn replay(msg: impl Into<String>) -> Self {
        Self::Replay {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
