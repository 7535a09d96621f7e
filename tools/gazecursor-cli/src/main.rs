//! GazeCursor CLI: hands-free cursor control from eye and head movement.
//!
//! Usage:
//!   gazecursor run --replay <DIR>      Drive the cursor from a recorded session
//!   gazecursor demo                    Drive the cursor from a synthetic face
//!   gazecursor calibrate --replay <DIR>  Report calibrated thresholds
//!   gazecursor check                   Check cursor backend availability
//!   gazecursor init-config             Write the default config file

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "gazecursor",
    about = "Move the mouse cursor with your eyes and head",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the standard location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that runs a session.
#[derive(Args, Clone)]
pub struct SessionArgs {
    /// Use an in-memory cursor instead of the system cursor
    #[arg(long)]
    virtual_cursor: bool,

    /// Write a JSONL trace of every control tick
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Keep the latest annotated frame in this PNG file
    #[arg(long)]
    annotate: Option<PathBuf>,

    /// Stop after this many control ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the cursor from a recorded session directory
    Run {
        /// Replay directory (landmarks.jsonl + frames)
        #[arg(long)]
        replay: PathBuf,

        /// Milliseconds between replayed frames
        #[arg(long, default_value = "33")]
        frame_interval_ms: u64,

        /// Keep controlling after the last frame instead of exiting
        #[arg(long)]
        keep_running: bool,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Drive the cursor from a synthetic swaying face
    Demo {
        /// Head sway amplitude in pixels
        #[arg(long, default_value = "12.0")]
        sway: f64,

        /// Frames per sway period
        #[arg(long, default_value = "90")]
        period: u64,

        /// Number of frames to generate (unbounded if omitted)
        #[arg(long)]
        frames: Option<u64>,

        /// Write the frames to a replay directory instead of running
        #[arg(long)]
        record: Option<PathBuf>,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Run calibration over a recorded session and report thresholds
    Calibrate {
        /// Replay directory (landmarks.jsonl + frames)
        #[arg(long)]
        replay: PathBuf,
    },

    /// Check cursor backend availability
    Check,

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = commands::load_config(cli.config.as_deref())?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    gazecursor_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Run {
            replay,
            frame_interval_ms,
            keep_running,
            session,
        } => commands::run::run(config, replay, frame_interval_ms, keep_running, session).await,
        Commands::Demo {
            sway,
            period,
            frames,
            record,
            session,
        } => match record {
            Some(dir) => commands::demo::record(sway, period, frames, dir),
            None => commands::demo::run(config, sway, period, frames, session).await,
        },
        Commands::Calibrate { replay } => commands::calibrate::run(config, replay),
        Commands::Check => commands::check::run(),
        Commands::InitConfig { force } => commands::init_config::run(force),
    }
}
