//! # Overlay
//!
//! Draws synced pairs through a scene-graph rendering client.
//!
//! Responsibilities:
//! - Fit the frame into the viewport (letterbox, aspect preserved)
//! - Interpret transform descriptors as line primitives
//! - Status / confidence legend and frame info HUD
//! - Bounded retry on render context loss
//!
//! Clients:
//! - `SoftwareClient`: headless `vello_cpu` rasterizer with PNG snapshots
//! - `RecordingClient`: records presented scenes (tests)

mod annotation;
mod geometry;
mod recording;
mod renderer;
mod software;

pub use annotation::{annotate, confidence_color, STROKE_WIDTH};
pub use geometry::{clip_line, grid_points, letterbox, Homography};
pub use recording::{PresentedScene, RecordingClient, RecordingLog};
pub use renderer::{OverlayOptions, OverlayRenderer, RenderOutcome, RenderStats};
pub use software::SoftwareClient;
