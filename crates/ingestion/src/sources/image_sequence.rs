//! Image sequence backend
//!
//! Plays a directory of PNG/JPEG files in file name order.

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use contracts::{Frame, FrameId, PixelFormat};
use tracing::{debug, info};

use super::CaptureBackend;
use crate::error::SourceFailure;

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Directory-of-images backend
#[derive(Debug)]
pub struct ImageSequenceBackend {
    dir: PathBuf,
    fps: f64,
    loop_playback: bool,
    files: Vec<PathBuf>,
    cursor: usize,
    produced: u64,
}

impl ImageSequenceBackend {
    /// Create a backend for the given directory
    pub fn new(dir: impl Into<PathBuf>, fps: f64, loop_playback: bool) -> Self {
        Self {
            dir: dir.into(),
            fps,
            loop_playback,
            files: Vec::new(),
            cursor: 0,
            produced: 0,
        }
    }

    /// Files discovered by `open`, in playback order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn list_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn decode(&self, path: &Path, id: FrameId) -> Result<Frame, SourceFailure> {
        let image = image::open(path)
            .map_err(|e| SourceFailure::decode(path.display().to_string(), e.to_string()))?
            .to_rgba8();
        let (width, height) = image.dimensions();

        let timestamp = if self.fps > 0.0 {
            self.produced as f64 / self.fps
        } else {
            0.0
        };

        Ok(Frame {
            id,
            timestamp,
            width,
            height,
            format: PixelFormat::Rgba8,
            data: Bytes::from(image.into_raw()),
        })
    }
}

impl CaptureBackend for ImageSequenceBackend {
    fn describe(&self) -> String {
        format!("file:{}", self.dir.display())
    }

    fn open(&mut self) -> Result<(), SourceFailure> {
        let files = Self::list_images(&self.dir).map_err(|e| {
            SourceFailure::unavailable(format!("cannot read {}: {e}", self.dir.display()))
        })?;
        if files.is_empty() {
            return Err(SourceFailure::unavailable(format!(
                "no PNG/JPEG files in {}",
                self.dir.display()
            )));
        }

        info!(dir = %self.dir.display(), files = files.len(), "image sequence opened");
        self.files = files;
        self.cursor = 0;
        self.produced = 0;
        Ok(())
    }

    fn capture(&mut self, id: FrameId) -> Result<Option<Frame>, SourceFailure> {
        if self.cursor >= self.files.len() {
            if !self.loop_playback || self.files.is_empty() {
                return Ok(None);
            }
            debug!(dir = %self.dir.display(), "image sequence looping");
            self.cursor = 0;
        }

        let path = self.files[self.cursor].clone();
        let frame = self.decode(&path, id)?;
        self.cursor += 1;
        self.produced += 1;
        Ok(Some(frame))
    }
}
