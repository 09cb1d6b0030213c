//! Scripted sources for tests
//!
//! Deterministic stand-ins for the frame source and the flow channel.
//! Each call consumes one scripted step, so a script is a tick-by-tick
//! timeline.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use contracts::{
    FlowResult, FlowResultChannel, Frame, FrameId, FramePoll, FrameSource, PixelFormat, VisError,
};
use tracing::trace;

/// Solid RGBA test frame
pub fn mock_frame(id: u64, width: u32, height: u32) -> Frame {
    let shade = (id % 200) as u8 + 40;
    let pixel = [shade, 255 - shade, 128, 255];
    let data: Vec<u8> = pixel
        .iter()
        .copied()
        .cycle()
        .take((width * height * 4) as usize)
        .collect();

    Frame {
        id: FrameId::new(id),
        timestamp: id as f64 / 30.0,
        width,
        height,
        format: PixelFormat::Rgba8,
        data: Bytes::from(data),
    }
}

/// One scripted `next_frame` outcome
#[derive(Debug, Clone)]
pub enum SourceStep {
    /// Deliver a frame
    Frame(Frame),
    /// No frame this tick
    Idle,
    /// Fail with `DeviceUnavailable`
    Fail(String),
    /// Report end-of-stream
    End,
}

/// Frame source replaying a script
#[derive(Debug)]
pub struct ScriptedFrameSource {
    name: String,
    steps: VecDeque<SourceStep>,
    pulls: Arc<AtomicU64>,
    stopped: Arc<AtomicBool>,
}

impl ScriptedFrameSource {
    /// Create a source from explicit steps
    pub fn new(name: &str, steps: Vec<SourceStep>) -> Self {
        Self {
            name: name.to_string(),
            steps: steps.into(),
            pulls: Arc::new(AtomicU64::new(0)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// One frame per pull with the given ids, then end-of-stream
    pub fn frames(ids: impl IntoIterator<Item = u64>, width: u32, height: u32) -> Self {
        let steps = ids
            .into_iter()
            .map(|id| SourceStep::Frame(mock_frame(id, width, height)))
            .collect();
        Self::new("scripted", steps)
    }

    /// Counter of `next_frame` calls
    pub fn pull_counter(&self) -> Arc<AtomicU64> {
        self.pulls.clone()
    }

    /// Flag set once `stop` was called
    pub fn stopped_flag(&self) -> Arc<AtomicBool> {
        self.stopped.clone()
    }
}

impl FrameSource for ScriptedFrameSource {
    fn describe(&self) -> String {
        format!("mock:{}", self.name)
    }

    fn next_frame(&mut self) -> Result<FramePoll, VisError> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        if self.stopped.load(Ordering::SeqCst) {
            return Ok(FramePoll::EndOfStream);
        }

        match self.steps.pop_front() {
            Some(SourceStep::Frame(frame)) => {
                trace!(frame_id = frame.id.get(), "scripted frame");
                Ok(FramePoll::Ready(frame))
            }
            Some(SourceStep::Idle) => Ok(FramePoll::Pending),
            Some(SourceStep::Fail(message)) => {
                Err(VisError::device_unavailable(self.describe(), message))
            }
            Some(SourceStep::End) | None => Ok(FramePoll::EndOfStream),
        }
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// One scripted `poll_results` outcome
#[derive(Debug, Clone)]
pub enum FlowStep {
    /// Deliver these results
    Results(Vec<FlowResult>),
    /// Fail with `AnalysisUnavailable`
    Fail(String),
}

/// Flow channel replaying a script; polls past the end return nothing
#[derive(Debug, Default)]
pub struct ScriptedFlowChannel {
    steps: VecDeque<FlowStep>,
    submitted: Arc<Mutex<Vec<FrameId>>>,
    polls: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
}

impl ScriptedFlowChannel {
    /// Create a channel from explicit steps
    pub fn new(steps: Vec<FlowStep>) -> Self {
        Self {
            steps: steps.into(),
            ..Default::default()
        }
    }

    /// One batch per poll
    pub fn batches(batches: Vec<Vec<FlowResult>>) -> Self {
        Self::new(batches.into_iter().map(FlowStep::Results).collect())
    }

    /// Ids of frames submitted for analysis, in order
    pub fn submitted(&self) -> Arc<Mutex<Vec<FrameId>>> {
        self.submitted.clone()
    }

    /// Counter of `poll_results` calls
    pub fn poll_counter(&self) -> Arc<AtomicU64> {
        self.polls.clone()
    }

    /// Flag set once `finish` was called
    pub fn finished_flag(&self) -> Arc<AtomicBool> {
        self.finished.clone()
    }
}

impl FlowResultChannel for ScriptedFlowChannel {
    fn poll_results(&mut self) -> Result<Vec<FlowResult>, VisError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(FlowStep::Results(results)) => Ok(results),
            Some(FlowStep::Fail(message)) => Err(VisError::analysis_unavailable(message)),
            None => Ok(Vec::new()),
        }
    }

    fn submit_frame(&mut self, frame: &Frame) {
        if let Ok(mut submitted) = self.submitted.lock() {
            submitted.push(frame.id);
        }
    }

    fn finish(&mut self) {
        self.finished.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::TransformDescriptor;

    #[test]
    fn test_scripted_source_timeline() {
        let mut source = ScriptedFrameSource::new(
            "cam",
            vec![
                SourceStep::Frame(mock_frame(1, 2, 2)),
                SourceStep::Idle,
                SourceStep::Fail("unplugged".to_string()),
            ],
        );
        let pulls = source.pull_counter();

        assert!(matches!(source.next_frame(), Ok(FramePoll::Ready(_))));
        assert!(matches!(source.next_frame(), Ok(FramePoll::Pending)));
        assert!(matches!(
            source.next_frame(),
            Err(VisError::DeviceUnavailable { .. })
        ));
        assert!(matches!(source.next_frame(), Ok(FramePoll::EndOfStream)));
        assert_eq!(pulls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_scripted_channel_records_submissions() {
        let mut channel = ScriptedFlowChannel::batches(vec![vec![FlowResult::new(
            FrameId::new(1),
            TransformDescriptor::Affine([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]),
            1.0,
        )]]);
        channel.submit_frame(&mock_frame(1, 2, 2));

        assert_eq!(channel.poll_results().unwrap().len(), 1);
        assert!(channel.poll_results().unwrap().is_empty());
        assert_eq!(*channel.submitted().lock().unwrap(), vec![FrameId::new(1)]);
    }

    #[test]
    fn test_mock_frame_is_well_formed() {
        let frame = mock_frame(7, 5, 3);
        assert!(frame.is_well_formed());
    }
}
