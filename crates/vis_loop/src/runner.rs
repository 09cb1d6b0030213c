//! The visualization loop

use std::collections::VecDeque;
use std::thread;
use std::time::Instant;

use contracts::{
    FlowResultChannel, Frame, FramePoll, FrameSource, RenderClient, SyncedPair, VisError,
    VisualizationConfig,
};
use observability::RunMetricsAggregator;
use overlay::{OverlayOptions, OverlayRenderer, RenderOutcome};
use sync_engine::FrameFlowSynchronizer;
use tracing::{debug, error, info, instrument, warn};

use crate::{LoopControl, LoopReport, LoopSettings, LoopState, StopReason};

/// Drives source → analysis → synchronizer → renderer, one tick at a time.
///
/// Owns every component and runs on a single thread; acquisition and
/// analysis workers live behind the `FrameSource` / `FlowResultChannel`
/// handles.
pub struct VisualizationLoop {
    source: Box<dyn FrameSource>,
    channel: Box<dyn FlowResultChannel>,
    client: Box<dyn RenderClient>,
    sync: FrameFlowSynchronizer,
    renderer: OverlayRenderer,
    settings: LoopSettings,
    control: LoopControl,

    state: LoopState,
    /// Synchronizer clock, advanced only by running ticks
    clock: u64,
    /// Emitted pairs not yet presented, oldest first
    backlog: VecDeque<SyncedPair>,
    /// Set once no more frames will be pulled
    draining: Option<StopReason>,
    stop_reason: Option<StopReason>,
    error: Option<VisError>,

    ticks: u64,
    paused_ticks: u64,
    frames_pulled: u64,
    aggregator: RunMetricsAggregator,
}

impl VisualizationLoop {
    /// Assemble a loop from opened collaborators
    pub fn new(
        source: Box<dyn FrameSource>,
        channel: Box<dyn FlowResultChannel>,
        client: Box<dyn RenderClient>,
        config: &VisualizationConfig,
    ) -> Self {
        let sync_config = config.sync_config();
        info!(
            source = %source.describe(),
            client = client.name(),
            max_wait_ticks = sync_config.max_wait_ticks,
            window_capacity = sync_config.window_capacity,
            "visualization loop assembled"
        );

        Self {
            source,
            channel,
            client,
            sync: FrameFlowSynchronizer::new(sync_config),
            renderer: OverlayRenderer::new(OverlayOptions::from(&config.render)),
            settings: LoopSettings::from(&config.runtime),
            control: LoopControl::new(),
            state: LoopState::Running,
            clock: 0,
            backlog: VecDeque::new(),
            draining: None,
            stop_reason: None,
            error: None,
            ticks: 0,
            paused_ticks: 0,
            frames_pulled: 0,
            aggregator: RunMetricsAggregator::new(),
        }
    }

    /// Override pacing and limits
    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use an externally created control handle
    pub fn with_control(mut self, control: LoopControl) -> Self {
        control.publish(self.state);
        self.control = control;
        self
    }

    /// Handle for pause / resume / stop from other threads
    pub fn control(&self) -> LoopControl {
        self.control.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Current synchronizer clock
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Fatal error that stopped the loop, if any
    pub fn take_error(&mut self) -> Option<VisError> {
        self.error.take()
    }

    /// Execute exactly one tick without sleeping
    #[instrument(level = "trace", name = "loop_step", skip(self), fields(tick = self.ticks + 1))]
    pub fn step(&mut self) -> LoopState {
        if self.state == LoopState::Stopped {
            return self.state;
        }

        let started = Instant::now();
        self.apply_control();
        match self.state {
            LoopState::Running => self.tick_running(),
            LoopState::Paused if self.control.take_step() => {
                debug!(clock = self.clock + 1, "single step while paused");
                self.tick_running();
            }
            LoopState::Paused => self.tick_paused(),
            LoopState::Stopped => return self.state,
        }
        observability::record_tick_duration(started.elapsed());

        if self.state != LoopState::Stopped {
            if let Some(max) = self.settings.max_ticks {
                if self.ticks >= max {
                    self.shutdown(StopReason::TickLimit);
                }
            }
        }
        self.state
    }

    /// Tick at the configured interval until stopped
    pub fn run(&mut self) -> LoopReport {
        info!(
            tick_interval_ms = self.settings.tick_interval.as_millis() as u64,
            max_ticks = ?self.settings.max_ticks,
            max_frames = ?self.settings.max_frames,
            "visualization loop running"
        );

        while self.state != LoopState::Stopped {
            let started = Instant::now();
            if self.step() == LoopState::Stopped {
                break;
            }
            if let Some(rest) = self.settings.tick_interval.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }

        self.report()
    }

    pub fn report(&self) -> LoopReport {
        LoopReport {
            state: self.state,
            stop_reason: self.stop_reason.clone(),
            ticks: self.ticks,
            paused_ticks: self.paused_ticks,
            frames_pulled: self.frames_pulled,
            backlog: self.backlog.len(),
            sync: self.sync.stats(),
            render: self.renderer.stats(),
            summary: self.aggregator.summary(),
        }
    }

    fn apply_control(&mut self) {
        if self.control.is_stop_requested() {
            self.shutdown(StopReason::Requested);
            return;
        }

        let pause = self.control.is_pause_requested();
        match self.state {
            LoopState::Running if pause => self.transition(LoopState::Paused),
            LoopState::Paused if !pause => self.transition(LoopState::Running),
            _ => {}
        }
        if self.state == LoopState::Running {
            self.control.discard_steps();
        }
    }

    fn tick_running(&mut self) {
        self.ticks += 1;
        self.clock += 1;
        let now = self.clock;

        let frame = match self.pull_frame() {
            Ok(frame) => frame,
            Err(e) => return self.fail(e),
        };

        let results = match self.channel.poll_results() {
            Ok(results) => results,
            Err(e) => return self.fail(e),
        };

        let emitted = self.sync.tick(now, frame, results);
        self.backlog.extend(emitted);

        if let Err(e) = self.render_backlog() {
            return self.fail(e);
        }

        if let Some(reason) = &self.draining {
            if self.sync.is_idle() && self.backlog.is_empty() {
                let reason = reason.clone();
                self.shutdown(reason);
            }
        }
    }

    /// Results keep flowing into the window; nothing is pulled or emitted
    fn tick_paused(&mut self) {
        self.ticks += 1;
        self.paused_ticks += 1;

        match self.channel.poll_results() {
            Ok(results) if !results.is_empty() => {
                debug!(count = results.len(), "absorbing results while paused");
                self.sync.push_results(results, self.clock);
            }
            Ok(_) => {}
            Err(e) => self.fail(e),
        }
    }

    fn pull_frame(&mut self) -> Result<Option<Frame>, VisError> {
        if self.draining.is_some() {
            return Ok(None);
        }

        match self.source.next_frame()? {
            FramePoll::Ready(frame) => {
                self.frames_pulled += 1;
                self.channel.submit_frame(&frame);

                if let Some(max) = self.settings.max_frames {
                    if self.frames_pulled >= max {
                        self.begin_drain(StopReason::FrameLimit);
                    }
                }
                Ok(Some(frame))
            }
            FramePoll::Pending => Ok(None),
            FramePoll::EndOfStream => {
                self.begin_drain(StopReason::EndOfStream);
                Ok(None)
            }
        }
    }

    fn begin_drain(&mut self, reason: StopReason) {
        info!(
            reason = %reason,
            frames_pulled = self.frames_pulled,
            pending = self.sync.pending_len(),
            "no more frames, draining window"
        );
        self.channel.finish();
        self.draining = Some(reason);
    }

    /// Present pending pairs in order; a skipped present keeps the pair
    /// (and everything after it) for the next tick.
    fn render_backlog(&mut self) -> Result<(), VisError> {
        while let Some(pair) = self.backlog.front() {
            match self.renderer.render(self.client.as_mut(), pair)? {
                RenderOutcome::Presented { .. } => {
                    observability::record_pair_metrics(pair);
                    self.aggregator.update(pair);
                    self.backlog.pop_front();
                }
                RenderOutcome::Skipped { attempt } => {
                    debug!(
                        frame_id = pair.frame_id().get(),
                        attempt,
                        backlog = self.backlog.len(),
                        "present skipped, retrying next tick"
                    );
                    break;
                }
            }
        }
        observability::record_backlog_depth(self.backlog.len());
        Ok(())
    }

    fn fail(&mut self, err: VisError) {
        if !err.is_fatal() {
            warn!(error = %err, "non-fatal error, continuing");
            return;
        }

        error!(
            collaborator = err.collaborator(),
            error = %err,
            tick = self.ticks,
            "visualization stopped: {} failed",
            err.collaborator()
        );
        self.shutdown(StopReason::Failed {
            collaborator: err.collaborator(),
            message: err.to_string(),
        });
        self.error = Some(err);
    }

    fn shutdown(&mut self, reason: StopReason) {
        if self.state == LoopState::Stopped {
            return;
        }

        self.source.stop();
        self.channel.stop();

        info!(
            reason = %reason,
            ticks = self.ticks,
            frames_pulled = self.frames_pulled,
            presented = self.renderer.stats().presented,
            unpresented = self.backlog.len() + self.sync.pending_len(),
            "visualization loop stopped"
        );
        self.stop_reason = Some(reason);
        self.transition(LoopState::Stopped);
    }

    fn transition(&mut self, next: LoopState) {
        if self.state == next {
            return;
        }
        debug!(from = %self.state, to = %next, "loop state change");
        self.state = next;
        self.control.publish(next);
        observability::record_loop_state(next.as_str());
    }
}

impl Drop for VisualizationLoop {
    fn drop(&mut self) {
        if self.state != LoopState::Stopped {
            self.source.stop();
            self.channel.stop();
        }
    }
}
