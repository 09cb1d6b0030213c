//! FrameSource / FlowResultChannel traits - acquisition abstractions
//!
//! The main loop only talks to frame and result producers through these
//! traits. Both are non-blocking: implementations run their I/O on worker
//! threads and hand values over through bounded queues.

use std::sync::Arc;

use crate::{FlowResult, Frame, VisError};

/// Outcome of a single `next_frame` call
#[derive(Debug)]
pub enum FramePoll {
    /// A frame is available
    Ready(Frame),
    /// No frame this tick; try again later
    Pending,
    /// The source is exhausted and will never produce another frame
    EndOfStream,
}

impl FramePoll {
    /// Extract the frame, if any
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            FramePoll::Ready(frame) => Some(frame),
            FramePoll::Pending | FramePoll::EndOfStream => None,
        }
    }
}

/// Frame source trait
///
/// Frames are delivered in strictly increasing id order and never twice.
///
/// # Errors
/// `next_frame` fails with [`VisError::DeviceUnavailable`] when the
/// underlying capture device cannot deliver frames.
pub trait FrameSource: Send {
    /// Device description for diagnostics
    fn describe(&self) -> String;

    /// Fetch the next frame without blocking the caller
    fn next_frame(&mut self) -> Result<FramePoll, VisError>;

    /// Stop acquisition; subsequent calls report end-of-stream
    fn stop(&mut self);
}

/// Value delivered by an analysis library callback
#[derive(Debug, Clone)]
pub enum FlowDelivery {
    /// A result (possibly flagged invalid)
    Result(FlowResult),
    /// The analysis library failed and will produce no more results
    Fatal(String),
}

/// Callback handed to callback-style analysis libraries.
///
/// May be invoked from any thread.
pub type FlowCallback = Arc<dyn Fn(FlowDelivery) + Send + Sync>;

/// Flow result channel trait
///
/// Results are returned in arrival order; the channel never reorders.
/// A per-frame analysis failure is a `FlowResult` with `valid = false`,
/// not an error.
///
/// # Errors
/// `poll_results` fails with [`VisError::AnalysisUnavailable`] once the
/// analysis library has signalled a fatal error.
pub trait FlowResultChannel: Send {
    /// Drain all results available right now (possibly none)
    fn poll_results(&mut self) -> Result<Vec<FlowResult>, VisError>;

    /// Offer a captured frame to the analysis side.
    ///
    /// Channels fed by an external producer ignore submissions.
    fn submit_frame(&mut self, _frame: &Frame) {}

    /// Signal that no further frames will be submitted
    fn finish(&mut self) {}

    /// Stop the producer side
    fn stop(&mut self) {}
}
