//! Subcommand implementations.

pub mod calibrate;
pub mod check;
pub mod demo;
pub mod init_config;
pub mod run;

use std::path::Path;

use gazecursor_common::config::AppConfig;
use gazecursor_cursor_driver::{detect_best_driver, CursorDriver, ScreenSize, VirtualCursor};
use gazecursor_engine::{GazeSession, SessionInputs, SessionOptions, SessionReport};
use gazecursor_tracker::{
    FrameSource, LabelFont, LandmarkProvider, PngRenderer, Renderer, StatusLogRenderer,
};

use crate::SessionArgs;

/// Explicit config paths must load; the default location falls back to defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => Ok(AppConfig::load_from(path)?),
        None => Ok(AppConfig::load()),
    }
}

/// Assemble session inputs from command-line options.
pub fn session_inputs(
    config: &AppConfig,
    args: &SessionArgs,
    frames: Box<dyn FrameSource>,
    landmarks: Box<dyn LandmarkProvider>,
) -> SessionInputs {
    let cursor: Box<dyn CursorDriver> = if args.virtual_cursor {
        Box::new(VirtualCursor::new(ScreenSize::default()))
    } else {
        detect_best_driver(ScreenSize::default())
    };

    let mut renderers: Vec<Box<dyn Renderer>> = vec![Box::new(StatusLogRenderer::new())];
    if let Some(path) = args
        .annotate
        .clone()
        .or_else(|| config.presentation.annotated_frame.clone())
    {
        let font = LabelFont::load(config.presentation.label_font.as_deref());
        renderers.push(Box::new(PngRenderer::new(path).with_font(font)));
    }

    SessionInputs {
        frames,
        landmarks,
        cursor,
        renderers,
    }
}

pub fn session_options(args: &SessionArgs, exit_when_source_ends: bool) -> SessionOptions {
    SessionOptions {
        exit_when_source_ends,
        max_ticks: args.max_ticks,
        trace_path: args.trace.clone(),
    }
}

/// Run a session until Ctrl+C or until it ends on its own, then report.
pub async fn drive(
    config: AppConfig,
    options: SessionOptions,
    inputs: SessionInputs,
    json: bool,
) -> anyhow::Result<()> {
    println!("Cursor backend: {}", inputs.cursor.name());
    let mut session = GazeSession::new(config, options);
    session.start(inputs)?;

    println!("Gaze control running. Press Ctrl+C to stop...");
    println!();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            println!();
        }
        _ = session.wait() => {}
    }

    let report = session.stop().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SessionReport) {
    println!("Session finished after {:.1}s", report.duration_secs);
    println!(
        "  Frames: {} ({} with a face, {} with both pupils)",
        report.acquisition.frames, report.acquisition.faces, report.acquisition.pupils_located
    );
    println!(
        "  Ticks: {} ({} moves, {} held, {} missed)",
        report.control.ticks, report.control.moves, report.control.held, report.control.misses
    );
    println!(
        "  Manual pauses: {}  Recenters: {}",
        report.control.manual_pauses, report.control.recenters
    );
    println!("  Renders: {}", report.presentation.renders);

    let errors = report.acquisition.source_errors
        + report.acquisition.landmark_errors
        + report.control.cursor_errors
        + report.control.trace_errors
        + report.presentation.render_errors;
    if errors > 0 {
        println!("  [WARN] {errors} errors, see log for details");
    }
}
