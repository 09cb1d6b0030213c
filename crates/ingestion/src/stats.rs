//! Acquisition and flow channel counters
//!
//! Shared between worker threads and the main thread through `Arc`.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Frame acquisition counters
#[derive(Debug, Default)]
pub struct AcquisitionStats {
    /// Frames produced by the capture backend
    pub frames_captured: AtomicU64,

    /// Frames delivered to the main thread
    pub frames_delivered: AtomicU64,

    /// Frames dropped (non-increasing id)
    pub frames_dropped: AtomicU64,

    /// Current queue length
    pub queue_len: AtomicUsize,

    /// Last failure reported by the backend
    last_error: Mutex<Option<String>>,
}

impl AcquisitionStats {
    /// Create new stats instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record frame captured on the worker
    pub fn record_captured(&self) {
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
    }

    /// Record frame handed to the loop
    pub fn record_delivered(&self) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record frame dropped
    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Update queue length
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Remember the most recent failure
    pub fn record_error(&self, message: impl Into<String>) {
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = Some(message.into());
        }
    }

    /// Get snapshot
    pub fn snapshot(&self) -> AcquisitionSnapshot {
        AcquisitionSnapshot {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
            last_error: self.last_error.lock().ok().and_then(|slot| slot.clone()),
        }
    }
}

/// Acquisition stats snapshot
#[derive(Debug, Clone, Default)]
pub struct AcquisitionSnapshot {
    pub frames_captured: u64,
    pub frames_delivered: u64,
    pub frames_dropped: u64,
    pub queue_len: usize,
    pub last_error: Option<String>,
}

/// Flow result channel counters
#[derive(Debug, Default)]
pub struct ChannelStats {
    /// Results accepted into the queue
    pub results_received: AtomicU64,

    /// Results dropped because the queue was full
    pub results_dropped: AtomicU64,

    /// Frames submitted for analysis
    pub frames_submitted: AtomicU64,

    /// Frame submissions dropped because the analyzer was saturated
    pub submissions_dropped: AtomicU64,
}

impl ChannelStats {
    /// Create new stats instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record result queued
    pub fn record_received(&self) {
        self.results_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record result dropped
    pub fn record_dropped(&self) {
        self.results_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record frame submitted
    pub fn record_submitted(&self) {
        self.frames_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record submission dropped
    pub fn record_submission_dropped(&self) {
        self.submissions_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            results_received: self.results_received.load(Ordering::Relaxed),
            results_dropped: self.results_dropped.load(Ordering::Relaxed),
            frames_submitted: self.frames_submitted.load(Ordering::Relaxed),
            submissions_dropped: self.submissions_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Channel stats snapshot
#[derive(Debug, Clone, Default)]
pub struct ChannelSnapshot {
    pub results_received: u64,
    pub results_dropped: u64,
    pub frames_submitted: u64,
    pub submissions_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_snapshot() {
        let stats = AcquisitionStats::new();
        stats.record_captured();
        stats.record_captured();
        stats.record_delivered();
        stats.record_dropped();
        stats.record_error("lost");

        let snap = stats.snapshot();
        assert_eq!(snap.frames_captured, 2);
        assert_eq!(snap.frames_delivered, 1);
        assert_eq!(snap.frames_dropped, 1);
        assert_eq!(snap.last_error.as_deref(), Some("lost"));
    }
}
