//! SyncedPair - Synchronizer output
//!
//! A frame associated with zero or one flow result.

use serde::{Deserialize, Serialize};

use crate::{FlowResult, Frame, FrameId};

/// How a pair came to be emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    /// Valid result matched within the wait budget
    Annotated,
    /// Result matched but flagged invalid by the analysis
    Invalid,
    /// No result within `max_wait_ticks`
    TimedOut,
    /// Forced out of a full window
    Evicted,
}

impl PairStatus {
    /// Stable snake_case label (logs, metrics)
    pub const fn as_str(self) -> &'static str {
        match self {
            PairStatus::Annotated => "annotated",
            PairStatus::Invalid => "invalid",
            PairStatus::TimedOut => "timed_out",
            PairStatus::Evicted => "evicted",
        }
    }
}

/// Frame paired with its flow result (if any)
#[derive(Debug, Clone)]
pub struct SyncedPair {
    /// Captured frame
    pub frame: Frame,

    /// Matched result, `None` when timed out or evicted without one
    pub result: Option<FlowResult>,

    /// Emission reason
    pub status: PairStatus,

    /// Sync diagnostics
    pub meta: SyncMeta,
}

impl SyncedPair {
    /// Frame id of this pair
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame.id
    }

    /// Result usable for annotation (present and valid)
    #[inline]
    pub fn annotation(&self) -> Option<&FlowResult> {
        self.result.as_ref().filter(|r| r.valid)
    }

    /// Whether the pair will be drawn with an annotation
    #[inline]
    pub fn is_annotated(&self) -> bool {
        self.annotation().is_some()
    }
}

/// Per-pair synchronization metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMeta {
    /// Tick the frame entered the window
    pub enqueued_tick: u64,

    /// Tick the pair was emitted
    pub emitted_tick: u64,

    /// Ticks until the result matched (None when never matched)
    pub result_wait_ticks: Option<u64>,

    /// Window occupancy at emission (including this frame)
    pub window_occupancy: usize,
}

impl SyncMeta {
    /// Ticks the frame spent in the window
    #[inline]
    pub fn wait_ticks(&self) -> u64 {
        self.emitted_tick.saturating_sub(self.enqueued_tick)
    }
}

/// Cumulative synchronizer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Frames accepted into the window
    pub frames_accepted: u64,
    /// Frames rejected for a non-increasing id
    pub frames_rejected: u64,
    /// Pairs emitted (all statuses)
    pub pairs_emitted: u64,
    /// Pairs emitted with a valid result
    pub annotated: u64,
    /// Pairs emitted with an invalid result
    pub invalid: u64,
    /// Pairs emitted after timing out
    pub timed_out: u64,
    /// Pairs forced out by a full window
    pub evicted: u64,
    /// Results discarded because their frame was already emitted
    pub late_results: u64,
    /// Results discarded because their frame was never seen
    pub orphan_results: u64,
    /// Results discarded because the frame already had one
    pub duplicate_results: u64,
    /// Highest window occupancy observed
    pub peak_occupancy: usize,
}
