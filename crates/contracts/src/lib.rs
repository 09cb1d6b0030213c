//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - The render tick (`u64`, incremented by the visualization loop) is the
//!   clock for synchronization decisions
//! - Frame timestamps (seconds, f64) are informational
//! - `FrameId` is the matching key between frames and flow results

mod config;
mod error;
mod flow;
mod frame;
mod render;
mod source;
mod sync;

pub use config::*;
pub use error::*;
pub use flow::*;
pub use frame::*;
pub use render::*;
pub use source::*;
pub use sync::*;

pub use kurbo;
