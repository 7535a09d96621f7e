//! Recorded sessions: a directory of frames plus their landmarks.
//!
//! Layout:
//!
//! ```text
//! <dir>/landmarks.jsonl   # one entry per frame, in order
//! <dir>/frame_000000.png
//! <dir>/frame_000001.png
//! ```
//!
//! Each manifest line is `{"frame": "<file>", "points": [[x, y], ...]}`
//! with exactly 68 points, or `"points": null` for a frame with no face.
//! Blank lines and lines starting with `#` are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use gazecursor_common::error::{GazeError, GazeResult};
use gazecursor_vision::{LandmarkSet, PixelPoint};

use crate::acquisition::{Frame, FrameSource, LandmarkProvider};

pub const MANIFEST_FILE: &str = "landmarks.jsonl";

#[derive(Debug, Serialize, Deserialize)]
struct ManifestLine {
    frame: PathBuf,
    points: Option<Vec<[i32; 2]>>,
}

/// One replay frame: the image path and the landmarks recorded for it.
#[derive(Debug, Clone)]
pub struct ReplayEntry {
    pub frame: PathBuf,
    pub landmarks: Option<LandmarkSet>,
}

/// A parsed replay directory.
#[derive(Debug, Clone)]
pub struct ReplayManifest {
    dir: PathBuf,
    entries: Vec<ReplayEntry>,
}

impl ReplayManifest {
    pub fn open(dir: &Path) -> GazeResult<Self> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Err(GazeError::FileNotFound { path });
        }
        let reader = BufReader::new(File::open(&path)?);

        let mut entries = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parsed: ManifestLine = serde_json::from_str(line)
                .map_err(|e| GazeError::replay(format!("{}:{}: {e}", path.display(), number + 1)))?;
            let landmarks = parsed
                .points
                .map(|points| {
                    LandmarkSet::new(points.into_iter().map(|[x, y]| PixelPoint::new(x, y)).collect())
                })
                .transpose()
                .map_err(|e| GazeError::replay(format!("{}:{}: {e}", path.display(), number + 1)))?;
            entries.push(ReplayEntry {
                frame: dir.join(parsed.frame),
                landmarks,
            });
        }

        tracing::debug!(dir = %dir.display(), frames = entries.len(), "Replay manifest loaded");
        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[ReplayEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Split into a frame source and the matching landmark provider.
    pub fn split(self) -> (ReplayFrames, ReplayLandmarks) {
        let frames = self.entries.iter().map(|e| e.frame.clone()).collect();
        let landmarks = self.entries.into_iter().map(|e| e.landmarks).collect();
        (
            ReplayFrames {
                frames,
                next: 0,
                interval: None,
                next_due: None,
            },
            ReplayLandmarks { landmarks },
        )
    }
}

/// Load a frame image as grayscale.
pub fn load_frame(index: u64, path: &Path) -> GazeResult<Frame> {
    let image = image::open(path)
        .map_err(|e| GazeError::frame_source(format!("{}: {e}", path.display())))?
        .to_luma8();
    Ok(Frame::new(index, image))
}

/// Frame source half of a replay.
#[derive(Debug)]
pub struct ReplayFrames {
    frames: Vec<PathBuf>,
    next: usize,
    interval: Option<Duration>,
    next_due: Option<Instant>,
}

impl ReplayFrames {
    /// Deliver at most one frame per `interval` instead of as fast as possible.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }
}

impl FrameSource for ReplayFrames {
    fn next_frame(&mut self) -> GazeResult<Option<Frame>> {
        let Some(path) = self.frames.get(self.next) else {
            return Ok(None);
        };
        if let Some(interval) = self.interval {
            let now = Instant::now();
            if self.next_due.is_some_and(|due| now < due) {
                return Ok(None);
            }
            self.next_due = Some(now + interval);
        }
        let index = self.next as u64;
        // Advance first so an unreadable frame is skipped, not retried forever.
        self.next += 1;
        load_frame(index, path).map(Some)
    }

    fn is_exhausted(&self) -> bool {
        self.next >= self.frames.len()
    }

    fn name(&self) -> &str {
        "replay"
    }
}

/// Landmark provider half of a replay.
#[derive(Debug)]
pub struct ReplayLandmarks {
    landmarks: Vec<Option<LandmarkSet>>,
}

impl LandmarkProvider for ReplayLandmarks {
    fn detect(&mut self, frame: &Frame) -> GazeResult<Option<LandmarkSet>> {
        self.landmarks
            .get(frame.index as usize)
            .cloned()
            .ok_or_else(|| GazeError::replay(format!("no landmarks recorded for frame {}", frame.index)))
    }

    fn name(&self) -> &str {
        "replay"
    }
}

/// Writes frames and landmarks in the replay layout.
pub struct ReplayRecorder {
    dir: PathBuf,
    writer: BufWriter<File>,
    frames_written: u64,
}

impl ReplayRecorder {
    pub fn create(dir: &Path) -> GazeResult<Self> {
        std::fs::create_dir_all(dir)?;
        let file = File::create(dir.join(MANIFEST_FILE))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            writer: BufWriter::new(file),
            frames_written: 0,
        })
    }

    pub fn record(&mut self, frame: &Frame, landmarks: Option<&LandmarkSet>) -> GazeResult<()> {
        let name = PathBuf::from(format!("frame_{:06}.png", self.frames_written));
        frame.image.save(self.dir.join(&name))?;

        let line = ManifestLine {
            frame: name,
            points: landmarks.map(|set| set.points().iter().map(|p| [p.x, p.y]).collect()),
        };
        writeln!(self.writer, "{}", serde_json::to_string(&line)?)?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> GazeResult<u64> {
        self.writer.flush()?;
        Ok(self.frames_written)
    }
}

impl Drop for ReplayRecorder {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
