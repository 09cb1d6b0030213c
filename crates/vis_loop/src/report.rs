//! Loop settings and the end-of-run report

use std::fmt;
use std::time::Duration;

use contracts::{RuntimeConfig, SyncStats};
use observability::RunSummary;
use overlay::RenderStats;

use crate::LoopState;

/// Pacing and limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    /// Target wall time per tick in `run()`
    pub tick_interval: Duration,
    /// Stop after this many ticks (paused ticks included)
    pub max_ticks: Option<u64>,
    /// Stop pulling after this many frames, then drain
    pub max_frames: Option<u64>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from(&RuntimeConfig::default())
    }
}

impl From<&RuntimeConfig> for LoopSettings {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            max_ticks: (config.max_ticks > 0).then_some(config.max_ticks),
            max_frames: (config.max_frames > 0).then_some(config.max_frames),
        }
    }
}

/// Why the loop reached `Stopped`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Source exhausted and the window drained
    EndOfStream,
    /// `LoopControl::stop`
    Requested,
    TickLimit,
    /// Frame limit reached and the window drained
    FrameLimit,
    /// Fatal error from a collaborator
    Failed {
        collaborator: &'static str,
        message: String,
    },
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, StopReason::Failed { .. })
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndOfStream => f.write_str("end of stream"),
            StopReason::Requested => f.write_str("stop requested"),
            StopReason::TickLimit => f.write_str("tick limit reached"),
            StopReason::FrameLimit => f.write_str("frame limit reached"),
            StopReason::Failed {
                collaborator,
                message,
            } => write!(f, "{collaborator} failed: {message}"),
        }
    }
}

/// Snapshot of a loop run
#[derive(Debug, Clone)]
pub struct LoopReport {
    pub state: LoopState,
    pub stop_reason: Option<StopReason>,
    /// Ticks executed, paused ones included
    pub ticks: u64,
    pub paused_ticks: u64,
    pub frames_pulled: u64,
    /// Pairs still waiting for a successful present
    pub backlog: usize,
    pub sync: SyncStats,
    pub render: RenderStats,
    pub summary: RunSummary,
}

impl fmt::Display for LoopReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "State: {}", self.state)?;
        if let Some(reason) = &self.stop_reason {
            writeln!(f, "Stop reason: {}", reason)?;
        }
        writeln!(
            f,
            "Ticks: {} ({} paused)",
            self.ticks, self.paused_ticks
        )?;
        writeln!(f, "Frames pulled: {}", self.frames_pulled)?;
        writeln!(
            f,
            "Frames presented: {} ({} annotated, {} skipped presents)",
            self.render.presented, self.render.annotated, self.render.skipped
        )?;
        writeln!(
            f,
            "Results discarded: {} late, {} orphan, {} duplicate",
            self.sync.late_results, self.sync.orphan_results, self.sync.duplicate_results
        )?;
        writeln!(f, "Peak window occupancy: {}", self.sync.peak_occupancy)?;
        write!(f, "{}", self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_zero_means_unlimited() {
        let settings = LoopSettings::from(&RuntimeConfig {
            tick_interval_ms: 10,
            max_ticks: 0,
            max_frames: 25,
            ..RuntimeConfig::default()
        });
        assert_eq!(settings.tick_interval, Duration::from_millis(10));
        assert_eq!(settings.max_ticks, None);
        assert_eq!(settings.max_frames, Some(25));
    }

    #[test]
    fn test_failed_reason_names_collaborator() {
        let reason = StopReason::Failed {
            collaborator: "video capture",
            message: "unplugged".to_string(),
        };
        assert!(reason.is_failure());
        assert_eq!(reason.to_string(), "video capture failed: unplugged");
        assert!(!StopReason::EndOfStream.is_failure());
    }
}
