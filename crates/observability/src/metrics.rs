//! Visualization run metrics
//!
//! Metric recording for emitted pairs and loop ticks, plus an in-memory
//! aggregator for the end-of-run summary.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use contracts::{PairStatus, SyncedPair};
use metrics::{counter, gauge, histogram};

/// Record metrics for one emitted pair.
///
/// Status counts and wait ticks are already recorded by the synchronizer;
/// this adds the per-frame view.
///
/// # Example
///
/// ```ignore
/// for pair in synchronizer.tick(now, frame, results) {
///     observability::record_pair_metrics(&pair);
/// }
/// ```
pub fn record_pair_metrics(pair: &SyncedPair) {
    gauge!("tfvis_last_frame_id").set(pair.frame_id().get() as f64);
    gauge!("tfvis_window_occupancy_at_emit").set(pair.meta.window_occupancy as f64);

    if let Some(wait) = pair.meta.result_wait_ticks {
        histogram!("tfvis_result_wait_ticks").record(wait as f64);
    }

    if let Some(result) = pair.annotation() {
        histogram!("tfvis_result_confidence").record(result.confidence as f64);
        counter!(
            "tfvis_descriptors_total",
            "kind" => result.descriptor.kind()
        )
        .increment(1);
    }
}

/// Record one loop tick's wall time
pub fn record_tick_duration(elapsed: Duration) {
    counter!("tfvis_loop_ticks_total").increment(1);
    histogram!("tfvis_tick_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
}

/// Record the number of pairs waiting for a successful present
pub fn record_backlog_depth(depth: usize) {
    gauge!("tfvis_render_backlog").set(depth as f64);
}

/// Record a loop state transition
pub fn record_loop_state(state: &'static str) {
    counter!("tfvis_loop_transitions_total", "state" => state).increment(1);
}

/// In-memory aggregation of emitted pairs
#[derive(Debug, Clone, Default)]
pub struct RunMetricsAggregator {
    /// Pairs seen
    pub total_pairs: u64,

    /// Pairs per status
    pub status_counts: BTreeMap<&'static str, u64>,

    /// Ticks between enqueue and emission
    pub wait_stats: RunningStats,

    /// Ticks between enqueue and result arrival
    pub result_wait_stats: RunningStats,

    /// Confidence of drawn annotations
    pub confidence_stats: RunningStats,

    /// Window occupancy at emission
    pub occupancy_stats: RunningStats,

    /// Drawn annotations per descriptor kind
    pub descriptor_counts: BTreeMap<&'static str, u64>,
}

impl RunMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one emitted pair into the aggregate
    pub fn update(&mut self, pair: &SyncedPair) {
        self.total_pairs += 1;
        *self.status_counts.entry(pair.status.as_str()).or_insert(0) += 1;

        self.wait_stats.push(pair.meta.wait_ticks() as f64);
        self.occupancy_stats.push(pair.meta.window_occupancy as f64);
        if let Some(wait) = pair.meta.result_wait_ticks {
            self.result_wait_stats.push(wait as f64);
        }

        if let Some(result) = pair.annotation() {
            self.confidence_stats.push(result.confidence as f64);
            *self
                .descriptor_counts
                .entry(result.descriptor.kind())
                .or_insert(0) += 1;
        }
    }

    fn count(&self, status: PairStatus) -> u64 {
        self.status_counts
            .get(status.as_str())
            .copied()
            .unwrap_or(0)
    }

    pub fn summary(&self) -> RunSummary {
        let annotated = self.count(PairStatus::Annotated);
        RunSummary {
            total_pairs: self.total_pairs,
            annotated,
            invalid: self.count(PairStatus::Invalid),
            timed_out: self.count(PairStatus::TimedOut),
            evicted: self.count(PairStatus::Evicted),
            annotation_rate: if self.total_pairs > 0 {
                annotated as f64 / self.total_pairs as f64 * 100.0
            } else {
                0.0
            },
            wait_ticks: StatsSummary::from(&self.wait_stats),
            result_wait_ticks: StatsSummary::from(&self.result_wait_stats),
            confidence: StatsSummary::from(&self.confidence_stats),
            occupancy: StatsSummary::from(&self.occupancy_stats),
            descriptor_counts: self.descriptor_counts.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Aggregated run metrics
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total_pairs: u64,
    pub annotated: u64,
    pub invalid: u64,
    pub timed_out: u64,
    pub evicted: u64,
    /// Percentage of pairs drawn with an annotation
    pub annotation_rate: f64,
    pub wait_ticks: StatsSummary,
    pub result_wait_ticks: StatsSummary,
    pub confidence: StatsSummary,
    pub occupancy: StatsSummary,
    pub descriptor_counts: BTreeMap<&'static str, u64>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Visualization Summary ===")?;
        writeln!(f, "Pairs presented: {}", self.total_pairs)?;
        writeln!(
            f,
            "Annotated: {} ({:.2}%)",
            self.annotated, self.annotation_rate
        )?;
        writeln!(f, "Invalid results: {}", self.invalid)?;
        writeln!(f, "Timed out: {}", self.timed_out)?;
        writeln!(f, "Evicted: {}", self.evicted)?;
        writeln!(f, "Wait (ticks): {}", self.wait_ticks)?;
        writeln!(f, "Result wait (ticks): {}", self.result_wait_ticks)?;
        writeln!(f, "Confidence: {}", self.confidence)?;
        writeln!(f, "Window occupancy: {}", self.occupancy)?;

        if !self.descriptor_counts.is_empty() {
            writeln!(f, "Descriptors:")?;
            for (kind, count) in &self.descriptor_counts {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}

/// Summary of a `RunningStats`
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean / variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
