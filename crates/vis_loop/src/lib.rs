//! # Visualization Loop
//!
//! Per-tick orchestration of acquisition, analysis, synchronization and
//! presentation.
//!
//! Responsibilities:
//! - Pull at most one frame per tick and hand it to analysis
//! - Feed frames and polled results to the synchronizer
//! - Present every emitted pair in order, retrying skipped presents
//! - Pause / single-step / resume / stop via a cross-thread `LoopControl`
//! - Stop on end-of-stream, limits, requests or the first fatal error
//!
//! ## Usage
//!
//! ```ignore
//! use vis_loop::VisualizationLoop;
//!
//! let mut vis = VisualizationLoop::new(source, channel, client, &config);
//! let control = vis.control();
//! ctrlc_handler(move || control.stop());
//!
//! let report = vis.run();
//! if let Some(err) = vis.take_error() {
//!     return Err(err.into());
//! }
//! ```

mod control;
mod report;
mod runner;

pub use control::{LoopControl, LoopState};
pub use report::{LoopReport, LoopSettings, StopReason};
pub use runner::VisualizationLoop;
