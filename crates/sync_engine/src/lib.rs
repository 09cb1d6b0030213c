//! # Sync Engine
//!
//! Frame / flow result synchronization.
//!
//! Responsibilities:
//! - Bounded window of frames awaiting their flow results
//! - Matching results to frames by `FrameId`
//! - Emitting pairs strictly in capture order, annotated or timed out
//! - Discarding late, duplicate and orphan results
//!
//! ## Usage
//!
//! ```ignore
//! use sync_engine::{FrameFlowSynchronizer, SyncConfig};
//!
//! let mut sync = FrameFlowSynchronizer::new(SyncConfig::default());
//!
//! // once per render tick
//! for pair in sync.tick(now, frame, results) {
//!     renderer.render(&pair)?;
//! }
//! ```

mod engine;
mod window;

pub use engine::FrameFlowSynchronizer;
pub use window::{AttachOutcome, PendingEntry, PendingWindow};

// Re-export contracts types
pub use contracts::{PairStatus, SyncConfig, SyncMeta, SyncStats, SyncedPair};
