//! Drive the cursor from a recorded session.

use std::path::PathBuf;
use std::time::Duration;

use gazecursor_common::config::AppConfig;
use gazecursor_tracker::ReplayManifest;

use crate::SessionArgs;

pub async fn run(
    config: AppConfig,
    replay: PathBuf,
    frame_interval_ms: u64,
    keep_running: bool,
    args: SessionArgs,
) -> anyhow::Result<()> {
    let manifest = ReplayManifest::open(&replay)?;
    println!("Replaying {} frames from {}", manifest.len(), replay.display());
    if manifest.is_empty() {
        anyhow::bail!("replay directory {} has no frames", replay.display());
    }

    let (frames, landmarks) = manifest.split();
    let frames = frames.with_frame_interval(Duration::from_millis(frame_interval_ms));

    let inputs = super::session_inputs(&config, &args, Box::new(frames), Box::new(landmarks));
    let options = super::session_options(&args, !keep_running);
    super::drive(config, options, inputs, args.json).await
}
