//! Threaded frame source
//!
//! Runs a [`CaptureBackend`] on a dedicated acquisition thread and hands
//! frames to the render thread through a bounded queue. The render thread
//! only ever calls `try_recv`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use async_channel::{bounded, Receiver, Sender, TryRecvError};
use contracts::{FrameId, FramePoll, FrameSource, VisError};
use tracing::{debug, info, instrument, trace, warn};

use super::CaptureBackend;
use crate::error::SourceFailure;
use crate::stats::AcquisitionStats;

/// Longest pacing sleep between checks of the stop flag
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(5);

/// Value crossing the acquisition queue
#[derive(Debug)]
pub enum Acquired {
    /// Captured frame
    Frame(contracts::Frame),
    /// Backend exhausted
    Finished,
    /// Backend failed; acquisition has ended
    Failed(SourceFailure),
}

/// Frame source backed by an acquisition thread
pub struct ThreadedFrameSource {
    description: String,
    rx: Receiver<Acquired>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<AcquisitionStats>,
    last_id: Option<FrameId>,
    finished: bool,
}

impl ThreadedFrameSource {
    /// Open the backend and start acquiring.
    ///
    /// The backend is opened on the calling thread so that an unavailable
    /// device is reported immediately.
    ///
    /// # Arguments
    /// * `backend` - Capture backend
    /// * `fps` - Capture pacing (non-positive = as fast as the queue allows)
    /// * `queue_capacity` - Frames buffered between the threads
    #[instrument(name = "frame_source_spawn", skip(backend), fields(device = %backend.describe()))]
    pub fn spawn(
        mut backend: Box<dyn CaptureBackend>,
        fps: f64,
        queue_capacity: usize,
    ) -> Result<Self, VisError> {
        let description = backend.describe();
        backend
            .open()
            .map_err(|failure| failure.into_vis_error(&description))?;

        let (tx, rx) = bounded(queue_capacity.max(1));
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(AcquisitionStats::new());
        let interval = (fps > 0.0).then(|| Duration::from_secs_f64(1.0 / fps));

        let handle = thread::Builder::new()
            .name("tfvis-capture".to_string())
            .spawn({
                let running = running.clone();
                let stats = stats.clone();
                move || capture_loop(backend, tx, running, stats, interval)
            })?;

        info!(device = %description, fps, queue_capacity, "frame acquisition started");

        Ok(Self {
            description,
            rx,
            running,
            handle: Some(handle),
            stats,
            last_id: None,
            finished: false,
        })
    }

    /// Get stats reference
    pub fn stats(&self) -> Arc<AcquisitionStats> {
        self.stats.clone()
    }

    /// Check if the acquisition thread is still producing
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed) && !self.finished
    }
}

fn capture_loop(
    mut backend: Box<dyn CaptureBackend>,
    tx: Sender<Acquired>,
    running: Arc<AtomicBool>,
    stats: Arc<AcquisitionStats>,
    interval: Option<Duration>,
) {
    let device = backend.describe();
    let mut next_id = FrameId::new(1);
    let mut deadline = Instant::now();

    debug!(device = %device, "capture worker started");

    while running.load(Ordering::Relaxed) {
        let acquired = match backend.capture(next_id) {
            Ok(Some(frame)) => {
                stats.record_captured();
                next_id = frame.id.max(next_id).next();
                Acquired::Frame(frame)
            }
            Ok(None) => Acquired::Finished,
            Err(failure) => {
                warn!(device = %device, error = %failure, "capture failed");
                stats.record_error(failure.to_string());
                Acquired::Failed(failure)
            }
        };

        let terminal = !matches!(acquired, Acquired::Frame(_));
        if tx.send_blocking(acquired).is_err() {
            debug!(device = %device, "frame queue closed");
            break;
        }
        stats.update_queue_len(tx.len());
        if terminal {
            break;
        }

        if let Some(interval) = interval {
            deadline += interval;
            let now = Instant::now();
            if deadline > now {
                if !sleep_while_running(deadline, &running) {
                    break;
                }
            } else {
                // Fell behind; don't try to catch up with a burst
                deadline = now;
            }
        }
    }

    backend.close();
    debug!(device = %device, "capture worker stopped");
}

/// Sleep until `deadline` in slices of at most [`STOP_CHECK_INTERVAL`].
///
/// Returns `false` as soon as `running` is cleared.
fn sleep_while_running(deadline: Instant, running: &AtomicBool) -> bool {
    loop {
        if !running.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(STOP_CHECK_INTERVAL));
    }
}

impl FrameSource for ThreadedFrameSource {
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn next_frame(&mut self) -> Result<FramePoll, VisError> {
        if self.finished {
            return Ok(FramePoll::EndOfStream);
        }

        let acquired = self.rx.try_recv();
        self.stats.update_queue_len(self.rx.len());

        match acquired {
            Ok(Acquired::Frame(frame)) => {
                if self.last_id.is_some_and(|last| frame.id <= last) {
                    warn!(
                        device = %self.description,
                        frame_id = frame.id.get(),
                        "dropping frame with non-increasing id"
                    );
                    self.stats.record_dropped();
                    metrics::counter!("tfvis_frames_dropped_total").increment(1);
                    return Ok(FramePoll::Pending);
                }
                self.last_id = Some(frame.id);
                self.stats.record_delivered();
                trace!(frame_id = frame.id.get(), "frame acquired");
                Ok(FramePoll::Ready(frame))
            }
            Ok(Acquired::Finished) => {
                info!(device = %self.description, "frame source exhausted");
                self.finished = true;
                Ok(FramePoll::EndOfStream)
            }
            Ok(Acquired::Failed(failure)) => {
                self.finished = true;
                Err(failure.into_vis_error(&self.description))
            }
            Err(TryRecvError::Empty) => Ok(FramePoll::Pending),
            Err(TryRecvError::Closed) => {
                self.finished = true;
                if self.running.load(Ordering::Relaxed) {
                    Err(SourceFailure::Disconnected.into_vis_error(&self.description))
                } else {
                    Ok(FramePoll::EndOfStream)
                }
            }
        }
    }

    fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            debug!(device = %self.description, "stopping frame acquisition");
        }
        self.finished = true;
        self.rx.close();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(device = %self.description, "capture worker panicked");
            }
        }
    }
}

impl Drop for ThreadedFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{DeviceBackend, SyntheticBackend};
    use contracts::Frame;

    fn poll_until_done(source: &mut ThreadedFrameSource) -> (Vec<u64>, Option<VisError>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut ids = Vec::new();
        while Instant::now() < deadline {
            match source.next_frame() {
                Ok(FramePoll::Ready(frame)) => ids.push(frame.id.get()),
                Ok(FramePoll::Pending) => thread::sleep(Duration::from_millis(1)),
                Ok(FramePoll::EndOfStream) => return (ids, None),
                Err(err) => return (ids, Some(err)),
            }
        }
        panic!("source did not finish in time");
    }

    /// Backend that fails on a given frame id
    struct FailingBackend {
        fail_at: u64,
    }

    impl CaptureBackend for FailingBackend {
        fn describe(&self) -> String {
            "test:failing".to_string()
        }

        fn open(&mut self) -> Result<(), SourceFailure> {
            Ok(())
        }

        fn capture(&mut self, id: FrameId) -> Result<Option<Frame>, SourceFailure> {
            if id.get() >= self.fail_at {
                return Err(SourceFailure::unavailable("cable unplugged"));
            }
            Ok(Some(SyntheticBackend::new(4, 4, 0.0, None).render(id)))
        }
    }

    #[test]
    fn test_frames_arrive_in_order_then_end() {
        let backend = SyntheticBackend::new(16, 16, 0.0, Some(5));
        let mut source = ThreadedFrameSource::spawn(Box::new(backend), 0.0, 2).unwrap();

        let (ids, err) = poll_until_done(&mut source);
        assert!(err.is_none());
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert!(matches!(source.next_frame(), Ok(FramePoll::EndOfStream)));
        assert_eq!(source.stats().snapshot().frames_delivered, 5);
    }

    #[test]
    fn test_unavailable_device_fails_at_spawn() {
        let result = ThreadedFrameSource::spawn(Box::new(DeviceBackend::new(3, 30.0)), 30.0, 2);
        match result {
            Err(err @ VisError::DeviceUnavailable { .. }) => {
                assert!(err.to_string().contains("device:3"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("device without driver must not open"),
        }
    }

    #[test]
    fn test_mid_stream_failure_is_reported_once() {
        let mut source =
            ThreadedFrameSource::spawn(Box::new(FailingBackend { fail_at: 3 }), 0.0, 4).unwrap();

        let (ids, err) = poll_until_done(&mut source);
        assert_eq!(ids, vec![1, 2]);
        assert!(matches!(err, Some(VisError::DeviceUnavailable { .. })));
        assert!(matches!(source.next_frame(), Ok(FramePoll::EndOfStream)));
        assert!(source.stats().snapshot().last_error.is_some());
    }

    #[test]
    fn test_stop_unblocks_worker() {
        let backend = SyntheticBackend::new(8, 8, 0.0, None);
        let mut source = ThreadedFrameSource::spawn(Box::new(backend), 0.0, 1).unwrap();

        // Worker is now blocked on a full queue
        thread::sleep(Duration::from_millis(20));
        source.stop();

        assert!(!source.is_running());
        assert!(matches!(source.next_frame(), Ok(FramePoll::EndOfStream)));
    }

    #[test]
    fn test_stop_interrupts_slow_pacing() {
        // One frame every two seconds
        let backend = SyntheticBackend::new(8, 8, 0.5, None);
        let mut source = ThreadedFrameSource::spawn(Box::new(backend), 0.5, 4).unwrap();
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        source.stop();
        assert!(
            started.elapsed() < Duration::from_millis(250),
            "stop took {:?}",
            started.elapsed()
        );
        assert!(!source.is_running());
    }
}
