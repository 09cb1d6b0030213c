//! Frame / flow result synchronizer.

use contracts::{FlowResult, Frame, FrameId, PairStatus, SyncConfig, SyncMeta, SyncStats, SyncedPair};
use tracing::{debug, instrument, trace, warn};

use crate::window::{AttachOutcome, PendingEntry, PendingWindow};

/// Pairs frames with their flow results.
///
/// Owned by the render thread. Producers never touch the window; they
/// hand frames and results to the loop, which feeds them in here.
///
/// Per tick the loop calls, in order:
/// 1. [`push_frame`](Self::push_frame) (at most once)
/// 2. [`push_results`](Self::push_results)
/// 3. [`drain_ready`](Self::drain_ready)
///
/// A frame enqueued at tick `t` accepts results pushed up to and
/// including tick `t + max_wait_ticks`. Emission is strictly in capture
/// order.
#[derive(Debug)]
pub struct FrameFlowSynchronizer {
    config: SyncConfig,
    window: PendingWindow,
    /// Newest frame id accepted into the window
    last_accepted: Option<FrameId>,
    /// Newest frame id emitted (results at or below this are late)
    last_emitted: Option<FrameId>,
    stats: SyncStats,
}

impl FrameFlowSynchronizer {
    /// Create a synchronizer with the given configuration
    pub fn new(config: SyncConfig) -> Self {
        Self {
            window: PendingWindow::new(config.window_capacity),
            config,
            last_accepted: None,
            last_emitted: None,
            stats: SyncStats::default(),
        }
    }

    /// Push a newly captured frame.
    ///
    /// Returns the oldest pending pair when the window was full and had to
    /// force it out. Frames whose id does not increase are rejected.
    #[instrument(
        level = "trace",
        name = "sync_push_frame",
        skip(self, frame),
        fields(frame_id = frame.id.get(), tick = now)
    )]
    pub fn push_frame(&mut self, frame: Frame, now: u64) -> Option<SyncedPair> {
        if self.last_accepted.is_some_and(|last| frame.id <= last) {
            warn!(
                frame_id = frame.id.get(),
                last_accepted = self.last_accepted.map(FrameId::get),
                "rejecting non-increasing frame id"
            );
            self.stats.frames_rejected += 1;
            metrics::counter!("tfvis_sync_frames_rejected_total").increment(1);
            return None;
        }

        self.last_accepted = Some(frame.id);
        self.stats.frames_accepted += 1;

        let occupancy_before = self.window.len();
        let evicted = self
            .window
            .push(frame, now)
            .map(|entry| self.emit(entry, PairStatus::Evicted, now, occupancy_before));

        if let Some(pair) = &evicted {
            debug!(
                frame_id = pair.frame_id().get(),
                capacity = self.window.capacity(),
                "window full, oldest frame force-emitted"
            );
        }

        self.stats.peak_occupancy = self.stats.peak_occupancy.max(self.window.len());
        metrics::gauge!("tfvis_sync_window_occupancy").set(self.window.len() as f64);

        evicted
    }

    /// Offer flow results to pending frames.
    ///
    /// Late results (frame already emitted) are discarded, never attached
    /// retroactively. An empty batch leaves the synchronizer unchanged.
    #[instrument(
        level = "trace",
        name = "sync_push_results",
        skip(self, results),
        fields(count = results.len(), tick = now)
    )]
    pub fn push_results(&mut self, results: Vec<FlowResult>, now: u64) {
        for result in results {
            self.push_result(result, now);
        }
    }

    fn push_result(&mut self, result: FlowResult, now: u64) {
        let frame_id = result.frame_id;

        if self.last_emitted.is_some_and(|emitted| frame_id <= emitted) {
            trace!(frame_id = frame_id.get(), "discarding late flow result");
            self.stats.late_results += 1;
            metrics::counter!("tfvis_sync_results_discarded_total", "reason" => "late")
                .increment(1);
            return;
        }

        match self.window.attach(result, now) {
            AttachOutcome::Matched => {
                trace!(frame_id = frame_id.get(), "flow result matched");
            }
            AttachOutcome::Duplicate => {
                self.stats.duplicate_results += 1;
                metrics::counter!("tfvis_sync_results_discarded_total", "reason" => "duplicate")
                    .increment(1);
            }
            AttachOutcome::NotPending => {
                debug!(frame_id = frame_id.get(), "flow result for unknown frame");
                self.stats.orphan_results += 1;
                metrics::counter!("tfvis_sync_results_discarded_total", "reason" => "orphan")
                    .increment(1);
            }
        }
    }

    /// Emit every pair that is ready at tick `now`, oldest first.
    ///
    /// The oldest pending frame is emitted when it has a result or has
    /// waited `max_wait_ticks`. Newer frames never overtake it.
    #[instrument(level = "trace", name = "sync_drain_ready", skip(self), fields(tick = now))]
    pub fn drain_ready(&mut self, now: u64) -> Vec<SyncedPair> {
        let mut ready = Vec::new();

        while let Some(front) = self.window.front() {
            let status = if front.is_resolved() {
                match &front.result {
                    Some(result) if result.valid => PairStatus::Annotated,
                    _ => PairStatus::Invalid,
                }
            } else if now.saturating_sub(front.enqueued_tick) >= self.config.max_wait_ticks {
                PairStatus::TimedOut
            } else {
                break;
            };

            let occupancy = self.window.len();
            if let Some(entry) = self.window.pop_front() {
                ready.push(self.emit(entry, status, now, occupancy));
            }
        }

        if !ready.is_empty() {
            metrics::gauge!("tfvis_sync_window_occupancy").set(self.window.len() as f64);
        }

        ready
    }

    /// Convenience wrapper running one full tick
    pub fn tick(
        &mut self,
        now: u64,
        frame: Option<Frame>,
        results: Vec<FlowResult>,
    ) -> Vec<SyncedPair> {
        let mut emitted: Vec<SyncedPair> = frame
            .and_then(|frame| self.push_frame(frame, now))
            .into_iter()
            .collect();
        self.push_results(results, now);
        emitted.extend(self.drain_ready(now));
        emitted
    }

    fn emit(
        &mut self,
        entry: PendingEntry,
        status: PairStatus,
        now: u64,
        occupancy: usize,
    ) -> SyncedPair {
        let PendingEntry {
            frame,
            result,
            enqueued_tick,
            matched_tick,
        } = entry;

        // An evicted frame keeps whatever result it already had
        let status = match (status, &result) {
            (PairStatus::Evicted, _) => PairStatus::Evicted,
            (_, Some(r)) if !r.valid => PairStatus::Invalid,
            (status, _) => status,
        };

        self.last_emitted = Some(frame.id);
        self.stats.pairs_emitted += 1;
        match status {
            PairStatus::Annotated => self.stats.annotated += 1,
            PairStatus::Invalid => self.stats.invalid += 1,
            PairStatus::TimedOut => self.stats.timed_out += 1,
            PairStatus::Evicted => self.stats.evicted += 1,
        }

        let meta = SyncMeta {
            enqueued_tick,
            emitted_tick: now,
            result_wait_ticks: matched_tick.map(|t| t.saturating_sub(enqueued_tick)),
            window_occupancy: occupancy,
        };

        metrics::counter!("tfvis_sync_pairs_total", "status" => status.as_str())
            .increment(1);
        metrics::histogram!("tfvis_sync_wait_ticks").record(meta.wait_ticks() as f64);

        trace!(
            frame_id = frame.id.get(),
            status = status.as_str(),
            wait_ticks = meta.wait_ticks(),
            "pair emitted"
        );

        SyncedPair {
            frame,
            result,
            status,
            meta,
        }
    }

    /// Number of frames waiting for results
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.window.len()
    }

    /// Whether nothing is pending
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.window.is_empty()
    }

    /// Newest frame id emitted so far
    #[inline]
    pub fn last_emitted(&self) -> Option<FrameId> {
        self.last_emitted
    }

    /// Cumulative counters
    #[inline]
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Active configuration
    #[inline]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }
}
