//! RenderClient trait - scene graph rendering abstraction
//!
//! The overlay renderer builds a scene of nodes each tick and asks the
//! client to present it. Geometry is expressed with `kurbo` types; every
//! node carries the affine transform from its own space to the viewport.

use kurbo::{Affine, Line, Point, Rect};
use thiserror::Error;

use crate::Frame;

/// Handle to a node in the current scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);
    pub const WHITE: Rgba = Rgba::opaque(255, 255, 255);
    pub const GREY: Rgba = Rgba::opaque(128, 128, 128);
    pub const RED: Rgba = Rgba::opaque(230, 40, 40);
    pub const AMBER: Rgba = Rgba::opaque(240, 170, 20);
    pub const GREEN: Rgba = Rgba::opaque(40, 200, 80);
    pub const CYAN: Rgba = Rgba::opaque(40, 200, 230);

    /// Fully opaque color
    #[inline]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Same color with a different alpha
    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

/// Line segment with its own color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredLine {
    pub line: Line,
    pub color: Rgba,
}

/// Scene graph node
#[derive(Debug, Clone)]
pub enum SceneNode {
    /// Frame drawn as a textured quad covering `(0,0)..(width,height)`
    /// in image space
    Image { frame: Frame, transform: Affine },

    /// Independent line segments
    Segments {
        segments: Vec<ColoredLine>,
        width: f64,
        transform: Affine,
    },

    /// Closed polygon outline
    Outline {
        points: Vec<Point>,
        color: Rgba,
        width: f64,
        transform: Affine,
    },

    /// Filled rectangle in viewport space
    FillRect { rect: Rect, color: Rgba },

    /// Text block in viewport space, one entry per line.
    /// `origin` is the top-left corner of the first line.
    Text {
        lines: Vec<String>,
        origin: Point,
        size: f32,
        color: Rgba,
    },
}

impl SceneNode {
    /// Short kind name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            SceneNode::Image { .. } => "image",
            SceneNode::Segments { .. } => "segments",
            SceneNode::Outline { .. } => "outline",
            SceneNode::FillRect { .. } => "fill_rect",
            SceneNode::Text { .. } => "text",
        }
    }
}

/// Output surface size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Viewport bounds as a rectangle
    pub fn rect(self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f64, self.height as f64)
    }
}

/// Rendering client errors
#[derive(Debug, Error)]
pub enum RenderError {
    /// Rendering context lost; the frame can be retried
    #[error("render context lost: {0}")]
    ContextLost(String),

    /// Node handle does not belong to the current scene
    #[error("unknown scene node {0:?}")]
    UnknownNode(NodeId),

    /// Backend failure unrelated to context loss
    #[error("render backend error: {0}")]
    Backend(String),
}

/// Rendering client trait
///
/// Scene graphs are not shared across threads; the client is owned by the
/// render thread.
pub trait RenderClient {
    /// Client name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Current output surface size
    fn viewport(&self) -> Viewport;

    /// Remove every node from the scene
    fn clear(&mut self) -> Result<(), RenderError>;

    /// Add a node to the scene
    fn add_node(&mut self, node: SceneNode) -> Result<NodeId, RenderError>;

    /// Replace an existing node
    fn update_node(&mut self, id: NodeId, node: SceneNode) -> Result<(), RenderError>;

    /// Draw the scene and swap it onto the output surface
    fn present(&mut self) -> Result<(), RenderError>;
}
