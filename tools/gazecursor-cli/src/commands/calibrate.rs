//! Run threshold calibration over a recorded session.

use std::path::PathBuf;

use gazecursor_common::clock::SessionClock;
use gazecursor_common::config::AppConfig;
use gazecursor_tracker::{FrameSource, GazeTracker, ReplayManifest};
use gazecursor_vision::EyeSide;

pub fn run(config: AppConfig, replay: PathBuf) -> anyhow::Result<()> {
    let manifest = ReplayManifest::open(&replay)?;
    println!("Calibrating on {} frames from {}", manifest.len(), replay.display());

    let (mut frames, landmarks) = manifest.split();
    let mut tracker = GazeTracker::new(landmarks, &config.tracking, SessionClock::start());

    while !tracker.calibration().is_complete() {
        match frames.next_frame() {
            Ok(Some(frame)) => {
                tracker.refresh(&frame);
            }
            Ok(None) => break,
            Err(e) => tracing::warn!(error = %e, "Skipping unreadable frame"),
        }
    }

    let stats = tracker.stats();
    println!(
        "Frames used: {} ({} with a face, {} with both pupils)",
        stats.frames, stats.faces, stats.pupils_located
    );
    for side in EyeSide::BOTH {
        let state = tracker.calibration().state(side);
        let status = if state.is_complete() { "[OK]" } else { "[WARN]" };
        match state.threshold() {
            Some(threshold) => println!(
                "{status} {} eye: threshold {threshold} ({}/{} samples)",
                side.as_str(),
                state.samples(),
                state.target()
            ),
            None => println!("{status} {} eye: no samples", side.as_str()),
        }
    }

    if !tracker.calibration().is_complete() {
        println!();
        println!("Calibration did not converge; the replay needs more frames with a visible face.");
    }
    Ok(())
}
