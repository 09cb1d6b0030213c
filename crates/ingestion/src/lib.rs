//! # Ingestion
//!
//! Frame acquisition and flow result delivery.
//!
//! Responsibilities:
//! - Capture backends (synthetic pattern, image sequence, device)
//! - Acquisition thread feeding a bounded queue (`ThreadedFrameSource`)
//! - Adapting callback-style analysis output to `poll_results`
//! - Analysis worker thread hosting a `FlowAnalyzer`
//! - Replaying recorded flow results
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{open_flow_channel, open_frame_source};
//!
//! let mut source = open_frame_source(&config)?;
//! let mut channel = open_flow_channel(&config)?;
//!
//! if let FramePoll::Ready(frame) = source.next_frame()? {
//!     channel.submit_frame(&frame);
//! }
//! let results = channel.poll_results()?;
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::{ScriptedFrameSource, SourceStep};
//!
//! let source = ScriptedFrameSource::frames(1..=5, 64, 48);
//! ```

mod error;
mod factory;
mod flow;
mod mock;
mod sources;
mod stats;

// Re-exports
pub use error::{AnalysisFault, SourceFailure};
pub use factory::{capture_backend, open_flow_channel, open_frame_source};
pub use flow::{
    AnalysisWorker, CallbackFlowChannel, FlowAnalyzer, NullFlowChannel, ReplayFlowChannel,
    ReplayRecord, SyntheticAnalyzer, SyntheticAnalyzerConfig,
};
pub use mock::{mock_frame, FlowStep, ScriptedFlowChannel, ScriptedFrameSource, SourceStep};
pub use sources::{
    Acquired, CaptureBackend, DeviceBackend, ImageSequenceBackend, SyntheticBackend,
    ThreadedFrameSource,
};
pub use stats::{AcquisitionSnapshot, AcquisitionStats, ChannelSnapshot, ChannelStats};
