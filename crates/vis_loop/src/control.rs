//! Loop state and the cross-thread control handle

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Visualization loop state. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Paused,
    Stopped,
}

impl LoopState {
    pub const fn as_str(self) -> &'static str {
        match self {
            LoopState::Running => "running",
            LoopState::Paused => "paused",
            LoopState::Stopped => "stopped",
        }
    }

    const fn to_u8(self) -> u8 {
        match self {
            LoopState::Running => 0,
            LoopState::Paused => 1,
            LoopState::Stopped => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LoopState::Running,
            1 => LoopState::Paused,
            _ => LoopState::Stopped,
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct ControlInner {
    pause: AtomicBool,
    stop: AtomicBool,
    steps: AtomicU64,
    state: AtomicU8,
}

/// Clonable handle for pausing, stepping, resuming and stopping a running loop.
///
/// Requests are applied at the start of the loop's next tick.
#[derive(Debug, Clone, Default)]
pub struct LoopControl {
    inner: Arc<ControlInner>,
}

impl LoopControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop pulling frames and freeze the synchronizer clock
    pub fn pause(&self) {
        self.inner.pause.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.inner.pause.store(false, Ordering::SeqCst);
    }

    /// Run exactly one full tick while paused; one frame is pulled and the
    /// clock advances by one. Ignored unless the loop is paused.
    pub fn step_once(&self) {
        self.inner.steps.fetch_add(1, Ordering::SeqCst);
    }

    /// Request a stop. Irreversible.
    pub fn stop(&self) {
        self.inner.stop.store(true, Ordering::SeqCst);
    }

    /// State as last published by the loop
    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    pub fn is_stop_requested(&self) -> bool {
        self.inner.stop.load(Ordering::SeqCst)
    }

    pub(crate) fn is_pause_requested(&self) -> bool {
        self.inner.pause.load(Ordering::SeqCst)
    }

    /// Consume one pending step request
    pub(crate) fn take_step(&self) -> bool {
        self.inner
            .steps
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    pub(crate) fn discard_steps(&self) {
        self.inner.steps.store(0, Ordering::SeqCst);
    }

    pub(crate) fn publish(&self, state: LoopState) {
        self.inner.state.store(state.to_u8(), Ordering::SeqCst);
    }
}
