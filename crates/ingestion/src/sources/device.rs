//! Live capture device backend
//!
//! This build carries no platform capture driver. Opening a device fails
//! with [`SourceFailure::Unavailable`], which the loop reports as a video
//! capture failure. Platform drivers plug in by implementing
//! [`CaptureBackend`] directly and handing the boxed backend to
//! [`ThreadedFrameSource::spawn`](super::ThreadedFrameSource::spawn).

use contracts::{Frame, FrameId};
use tracing::warn;

use super::CaptureBackend;
use crate::error::SourceFailure;

/// Capture device selected by index
#[derive(Debug, Clone)]
pub struct DeviceBackend {
    index: u32,
    fps: f64,
}

impl DeviceBackend {
    /// Create a backend for device `index`
    pub fn new(index: u32, fps: f64) -> Self {
        Self { index, fps }
    }

    /// Requested capture rate
    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl CaptureBackend for DeviceBackend {
    fn describe(&self) -> String {
        format!("device:{}", self.index)
    }

    fn open(&mut self) -> Result<(), SourceFailure> {
        warn!(device = self.index, "no capture driver available");
        Err(SourceFailure::unavailable(format!(
            "no capture driver available for device {}",
            self.index
        )))
    }

    fn capture(&mut self, _id: FrameId) -> Result<Option<Frame>, SourceFailure> {
        Err(SourceFailure::unavailable("device not open"))
    }
}
