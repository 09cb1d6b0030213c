//! Frame source backends

mod device;
mod image_sequence;
mod synthetic;
mod worker;

pub use device::DeviceBackend;
pub use image_sequence::ImageSequenceBackend;
pub use synthetic::SyntheticBackend;
pub use worker::{Acquired, ThreadedFrameSource};

use contracts::{Frame, FrameId};

use crate::error::SourceFailure;

/// Capture backend trait
///
/// Runs on the acquisition thread only. `ThreadedFrameSource` owns the
/// id sequence and paces calls to `capture`.
pub trait CaptureBackend: Send {
    /// Device description (e.g. `device:0`, `file:/frames`)
    fn describe(&self) -> String;

    /// Acquire the device.
    ///
    /// Called once on the opening thread before acquisition starts.
    fn open(&mut self) -> Result<(), SourceFailure>;

    /// Capture the frame with the given id.
    ///
    /// Returns `Ok(None)` when the backend is exhausted.
    fn capture(&mut self, id: FrameId) -> Result<Option<Frame>, SourceFailure>;

    /// Release the device
    fn close(&mut self) {}
}
