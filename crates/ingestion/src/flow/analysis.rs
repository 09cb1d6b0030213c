//! Analysis worker
//!
//! Runs a [`FlowAnalyzer`] on its own thread. Frames are submitted from
//! the render thread without blocking; results come back through a
//! [`CallbackFlowChannel`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{FlowCallback, FlowDelivery, FlowResult, FlowResultChannel, Frame, VisError};
use tracing::{debug, info, instrument, trace, warn};

use super::CallbackFlowChannel;
use crate::error::AnalysisFault;
use crate::stats::ChannelStats;

/// Transform flow analysis library seam
///
/// Called on the analysis thread only. An analyzer may hold results back
/// (pipelined analysis) and release them on later calls.
pub trait FlowAnalyzer: Send {
    /// Analyzer name (used for logging)
    fn name(&self) -> &str;

    /// Analyze one frame and return every result that became ready.
    ///
    /// A per-frame failure is an invalid `FlowResult`. An `Err` is fatal
    /// and ends analysis.
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<FlowResult>, AnalysisFault>;

    /// Release results still held back after the last frame
    fn flush(&mut self) -> Vec<FlowResult> {
        Vec::new()
    }
}

/// Flow result channel backed by an analysis thread
pub struct AnalysisWorker {
    analyzer: String,
    frames: Sender<Frame>,
    channel: CallbackFlowChannel,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<ChannelStats>,
}

impl AnalysisWorker {
    /// Start the analysis thread
    ///
    /// # Arguments
    /// * `analyzer` - Analysis implementation
    /// * `frame_capacity` - Frames queued for analysis before submissions drop
    /// * `result_capacity` - Results buffered before deliveries drop
    #[instrument(name = "analysis_worker_spawn", skip(analyzer), fields(analyzer = %analyzer.name()))]
    pub fn spawn(
        analyzer: Box<dyn FlowAnalyzer>,
        frame_capacity: usize,
        result_capacity: usize,
    ) -> Result<Self, VisError> {
        let name = analyzer.name().to_string();
        let (frames, frames_rx) = bounded(frame_capacity.max(1));
        let channel = CallbackFlowChannel::new(result_capacity);
        let stats = channel.stats();
        let running = Arc::new(AtomicBool::new(true));

        let handle = thread::Builder::new()
            .name("tfvis-analysis".to_string())
            .spawn({
                let callback = channel.callback();
                let running = running.clone();
                move || analysis_loop(analyzer, frames_rx, callback, running)
            })?;

        info!(analyzer = %name, frame_capacity, result_capacity, "analysis worker started");

        Ok(Self {
            analyzer: name,
            frames,
            channel,
            running,
            handle: Some(handle),
            stats,
        })
    }

    /// Get stats reference
    pub fn stats(&self) -> Arc<ChannelStats> {
        self.stats.clone()
    }

    /// Check if the analysis thread is accepting frames
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed) && !self.frames.is_closed()
    }
}

fn analysis_loop(
    mut analyzer: Box<dyn FlowAnalyzer>,
    frames: Receiver<Frame>,
    callback: FlowCallback,
    running: Arc<AtomicBool>,
) {
    debug!(analyzer = %analyzer.name(), "analysis worker started");

    while let Ok(frame) = frames.recv_blocking() {
        if !running.load(Ordering::Relaxed) {
            break;
        }

        match analyzer.analyze(&frame) {
            Ok(results) => {
                for result in results {
                    callback(FlowDelivery::Result(result));
                }
            }
            Err(fault) => {
                callback(FlowDelivery::Fatal(fault.to_string()));
                return;
            }
        }
    }

    // Input finished (not stopped): hand out anything still held back
    if running.load(Ordering::Relaxed) {
        for result in analyzer.flush() {
            callback(FlowDelivery::Result(result));
        }
    }

    debug!(analyzer = %analyzer.name(), "analysis worker stopped");
}

impl FlowResultChannel for AnalysisWorker {
    fn poll_results(&mut self) -> Result<Vec<FlowResult>, VisError> {
        self.channel.poll_results()
    }

    fn submit_frame(&mut self, frame: &Frame) {
        match self.frames.try_send(frame.clone()) {
            Ok(()) => {
                self.stats.record_submitted();
                trace!(frame_id = frame.id.get(), "frame submitted for analysis");
            }
            Err(TrySendError::Full(_)) => {
                self.stats.record_submission_dropped();
                metrics::counter!("tfvis_analysis_submissions_dropped_total").increment(1);
                debug!(frame_id = frame.id.get(), "analyzer saturated, frame not analyzed");
            }
            Err(TrySendError::Closed(_)) => {
                trace!(frame_id = frame.id.get(), "analysis input closed");
            }
        }
    }

    fn finish(&mut self) {
        if self.frames.close() {
            debug!(analyzer = %self.analyzer, "analysis input finished");
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.frames.close();
        self.channel.stop();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(analyzer = %self.analyzer, "analysis worker panicked");
            }
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SyntheticBackend;
    use contracts::{FrameId, TransformDescriptor};
    use std::time::{Duration, Instant};

    /// Echoes every frame, holding `lag` results back
    struct EchoAnalyzer {
        held: Vec<FlowResult>,
        lag: usize,
        fail_on: Option<u64>,
    }

    impl FlowAnalyzer for EchoAnalyzer {
        fn name(&self) -> &str {
            "echo"
        }

        fn analyze(&mut self, frame: &Frame) -> Result<Vec<FlowResult>, AnalysisFault> {
            if self.fail_on == Some(frame.id.get()) {
                return Err(AnalysisFault::new("echo", "device lost"));
            }
            self.held.push(FlowResult::new(
                frame.id,
                TransformDescriptor::Affine([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]),
                1.0,
            ));
            let ready = self.held.len().saturating_sub(self.lag);
            Ok(self.held.drain(..ready).collect())
        }

        fn flush(&mut self) -> Vec<FlowResult> {
            std::mem::take(&mut self.held)
        }
    }

    fn frame(id: u64) -> Frame {
        SyntheticBackend::new(4, 4, 30.0, None).render(FrameId::new(id))
    }

    fn collect(worker: &mut AnalysisWorker, want: usize) -> Result<Vec<u64>, VisError> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut ids = Vec::new();
        while ids.len() < want && Instant::now() < deadline {
            ids.extend(worker.poll_results()?.iter().map(|r| r.frame_id.get()));
            thread::sleep(Duration::from_millis(1));
        }
        Ok(ids)
    }

    #[test]
    fn test_results_follow_submissions() {
        let analyzer = EchoAnalyzer {
            held: Vec::new(),
            lag: 0,
            fail_on: None,
        };
        let mut worker = AnalysisWorker::spawn(Box::new(analyzer), 8, 8).unwrap();
        for id in 1..=3 {
            worker.submit_frame(&frame(id));
        }

        assert_eq!(collect(&mut worker, 3).unwrap(), vec![1, 2, 3]);
        assert_eq!(worker.stats().snapshot().frames_submitted, 3);
    }

    #[test]
    fn test_finish_flushes_held_results() {
        let analyzer = EchoAnalyzer {
            held: Vec::new(),
            lag: 2,
            fail_on: None,
        };
        let mut worker = AnalysisWorker::spawn(Box::new(analyzer), 8, 8).unwrap();
        for id in 1..=3 {
            worker.submit_frame(&frame(id));
        }
        worker.finish();

        assert_eq!(collect(&mut worker, 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_fault_surfaces_as_analysis_unavailable() {
        let analyzer = EchoAnalyzer {
            held: Vec::new(),
            lag: 0,
            fail_on: Some(2),
        };
        let mut worker = AnalysisWorker::spawn(Box::new(analyzer), 8, 8).unwrap();
        worker.submit_frame(&frame(1));
        worker.submit_frame(&frame(2));

        let deadline = Instant::now() + Duration::from_secs(5);
        let err = loop {
            match worker.poll_results() {
                Err(err) => break err,
                Ok(_) if Instant::now() > deadline => panic!("fault never surfaced"),
                Ok(_) => thread::sleep(Duration::from_millis(1)),
            }
        };
        assert!(matches!(err, VisError::AnalysisUnavailable { .. }));
        assert!(err.to_string().contains("device lost"));
    }
}
