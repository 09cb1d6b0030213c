//! FlowResult - transform flow analysis output
//!
//! The descriptor shape belongs to the analysis library. Only the renderer
//! interprets it; every other component treats it as an opaque payload.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::FrameId;

/// Transform flow result for one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowResult {
    /// Frame this result describes
    pub frame_id: FrameId,

    /// Transform estimate
    pub descriptor: TransformDescriptor,

    /// False when analysis failed for this frame (transient, not fatal)
    pub valid: bool,

    /// Estimate confidence in `[0, 1]`
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl FlowResult {
    /// Valid result with the given descriptor and confidence
    pub fn new(frame_id: FrameId, descriptor: TransformDescriptor, confidence: f32) -> Self {
        Self {
            frame_id,
            descriptor,
            valid: true,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Result marking a per-frame analysis failure
    pub fn invalid(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            descriptor: TransformDescriptor::Raw(Bytes::new()),
            valid: false,
            confidence: 0.0,
        }
    }
}

/// Transform estimate payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum TransformDescriptor {
    /// 3x3 homography, row-major, image pixel space
    Homography([f64; 9]),

    /// 2D affine in `[a, b, c, d, e, f]` order: `x' = a*x + c*y + e`,
    /// `y' = b*x + d*y + f`
    Affine([f64; 6]),

    /// Sparse per-point motion vectors
    VectorField(Vec<FlowVector>),

    /// Tracked regions with their displacement
    Regions(Vec<TrackedRegion>),

    /// Unrecognised payload (fallback)
    Raw(Bytes),
}

impl TransformDescriptor {
    /// Identity homography
    pub const IDENTITY_HOMOGRAPHY: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

    /// Short kind name for logs and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            TransformDescriptor::Homography(_) => "homography",
            TransformDescriptor::Affine(_) => "affine",
            TransformDescriptor::VectorField(_) => "vector_field",
            TransformDescriptor::Regions(_) => "regions",
            TransformDescriptor::Raw(_) => "raw",
        }
    }
}

/// Motion vector anchored in image space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowVector {
    /// Origin x (pixels)
    pub x: f64,
    /// Origin y (pixels)
    pub y: f64,
    /// Displacement along x (pixels)
    pub dx: f64,
    /// Displacement along y (pixels)
    pub dy: f64,
    /// Per-vector confidence in `[0, 1]`
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

/// Axis-aligned tracked region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedRegion {
    /// Left edge (pixels)
    pub x: f64,
    /// Top edge (pixels)
    pub y: f64,
    /// Width (pixels)
    pub width: f64,
    /// Height (pixels)
    pub height: f64,
    /// Displacement along x since the previous frame
    pub dx: f64,
    /// Displacement along y since the previous frame
    pub dy: f64,
    /// Optional label
    #[serde(default)]
    pub label: Option<String>,
}
