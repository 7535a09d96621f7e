//! Append-only JSONL trace of control ticks.
//!
//! The first line is a `#`-prefixed header; every following line is one
//! [`TickRecord`].

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use gazecursor_common::error::GazeResult;
use gazecursor_platform_core::{ScreenPoint, ScreenSize};

use crate::controller::{ControlState, TickOutcome};

/// Flush every this many records.
const FLUSH_EVERY: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceHeader {
    pub schema_version: String,
    pub epoch_wall: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub tick_ms: u64,
    pub cursor: String,
}

impl TraceHeader {
    pub fn new(epoch_wall: &str, screen: ScreenSize, tick_ms: u64, cursor: &str) -> Self {
        Self {
            schema_version: "1.0".to_string(),
            epoch_wall: epoch_wall.to_string(),
            screen_width: screen.width,
            screen_height: screen.height,
            tick_ms,
            cursor: cursor.to_string(),
        }
    }
}

/// One control tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickRecord {
    pub tick: u64,
    /// Milliseconds since session start.
    pub t_ms: u64,
    /// Tracker generation observed, if any was published.
    pub generation: Option<u64>,
    pub state: ControlState,
    pub outcome: TickOutcome,
    pub cursor: Option<ScreenPoint>,
}

pub struct TraceWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    records_written: u64,
}

impl TraceWriter {
    /// Create the trace file, writing the header as the first line.
    pub fn create(path: &Path, header: &TraceHeader) -> GazeResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "# {}", serde_json::to_string(header)?)?;

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            records_written: 0,
        })
    }

    pub fn write(&mut self, record: &TickRecord) -> GazeResult<()> {
        writeln!(self.writer, "{}", serde_json::to_string(record)?)?;
        self.records_written += 1;
        if self.records_written % FLUSH_EVERY == 0 {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> GazeResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TraceWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
