//! Drive the cursor from a synthetic face, or record one as a replay.

use std::path::PathBuf;

use gazecursor_common::config::AppConfig;
use gazecursor_tracker::synthetic::SyntheticFace;
use gazecursor_tracker::ReplayRecorder;

use crate::SessionArgs;

/// Camera-like frame pacing for the synthetic source.
const FRAME_INTERVAL_MS: u64 = 33;

/// Frames written by `--record` when `--frames` is not given.
const DEFAULT_RECORD_FRAMES: u64 = 180;

pub async fn run(
    config: AppConfig,
    sway: f64,
    period: u64,
    frames: Option<u64>,
    args: SessionArgs,
) -> anyhow::Result<()> {
    println!("Synthetic face: sway {sway}px every {period} frames");

    let (source, landmarks) = SyntheticFace::swaying(sway, period).split(frames);
    let source = source.with_frame_interval(std::time::Duration::from_millis(FRAME_INTERVAL_MS));

    let inputs = super::session_inputs(&config, &args, Box::new(source), Box::new(landmarks));
    let options = super::session_options(&args, frames.is_some());
    super::drive(config, options, inputs, args.json).await
}

pub fn record(sway: f64, period: u64, frames: Option<u64>, dir: PathBuf) -> anyhow::Result<()> {
    let face = SyntheticFace::swaying(sway, period);
    let count = frames.unwrap_or(DEFAULT_RECORD_FRAMES);

    let mut recorder = ReplayRecorder::create(&dir)?;
    for index in 0..count {
        recorder.record(&face.frame(index), face.landmarks(index).as_ref())?;
    }
    let written = recorder.finish()?;

    println!("Recorded {written} synthetic frames to {}", dir.display());
    println!("Replay with: gazecursor run --replay {}", dir.display());
    Ok(())
}
