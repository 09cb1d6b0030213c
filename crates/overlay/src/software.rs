//! Headless software render client
//!
//! Builds a `vello_cpu` scene from the nodes on `present` and renders it
//! into a pixmap:
//! - Image nodes: image paint under the node's affine
//! - Segments / outlines: stroked paths, clipped to the viewport first
//! - Fill rects: solid fill
//! - Text: shaped with `parley` when a HUD font is loaded, skipped otherwise
//!
//! The pixmap is copied into an RGBA framebuffer after each present;
//! every n-th framebuffer can be written as a PNG.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use contracts::{
    Frame, NodeId, RenderClient, RenderConfig, RenderError, Rgba, SceneNode, VisError, Viewport,
};
use image::RgbaImage;
use kurbo::{Affine, Line, Point, Rect};
use tracing::{debug, info, warn};

use crate::geometry::clip_line;

/// PNG snapshot settings
#[derive(Debug, Clone)]
struct Snapshots {
    dir: PathBuf,
    every: u64,
}

/// Glyph color carried through text layout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct TextBrush {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl From<Rgba> for TextBrush {
    fn from(c: Rgba) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// Font and shaping contexts for text nodes
struct HudText {
    font: vello_cpu::peniko::FontData,
    family: String,
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
}

impl HudText {
    fn load(bytes: Vec<u8>) -> Result<Self, RenderError> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| RenderError::Backend("no font families in HUD font".into()))?;
        let family = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| RenderError::Backend("HUD font family has no name".into()))?
            .to_string();

        Ok(Self {
            font: vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), 0),
            family,
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
        })
    }

    fn layout(&mut self, text: &str, size: f32, brush: TextBrush) -> parley::Layout<TextBrush> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(self.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }

    fn draw(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        lines: &[String],
        origin: Point,
        size: f32,
        color: Rgba,
    ) {
        if lines.is_empty() || !size.is_finite() || size <= 0.0 {
            return;
        }
        let layout = self.layout(&lines.join("\n"), size, color.into());

        ctx.set_transform(affine_to_cpu(Affine::translate(origin.to_vec2())));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));

                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&self.font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }
}

/// Software rasterizing client
pub struct SoftwareClient {
    viewport: Viewport,
    pixmap: vello_cpu::Pixmap,
    framebuffer: RgbaImage,
    nodes: Vec<SceneNode>,
    hud: Option<HudText>,
    presented: u64,
    snapshots: Option<Snapshots>,
}

impl fmt::Debug for SoftwareClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareClient")
            .field("viewport", &self.viewport)
            .field("nodes", &self.nodes.len())
            .field("hud_font", &self.hud.as_ref().map(|h| h.family.as_str()))
            .field("presented", &self.presented)
            .field("snapshots", &self.snapshots)
            .finish()
    }
}

impl SoftwareClient {
    /// Create a client with a black framebuffer.
    ///
    /// Sides beyond `u16::MAX` are clamped.
    pub fn new(viewport: Viewport) -> Self {
        let width = u16::try_from(viewport.width).unwrap_or(u16::MAX);
        let height = u16::try_from(viewport.height).unwrap_or(u16::MAX);
        let viewport = Viewport {
            width: u32::from(width),
            height: u32::from(height),
        };

        Self {
            viewport,
            pixmap: vello_cpu::Pixmap::new(width, height),
            framebuffer: RgbaImage::from_pixel(
                viewport.width,
                viewport.height,
                image::Rgba([0, 0, 0, 255]),
            ),
            nodes: Vec::new(),
            hud: None,
            presented: 0,
            snapshots: None,
        }
    }

    /// Client sized and configured from render settings
    ///
    /// # Errors
    /// I/O errors creating the snapshot directory or reading the HUD font;
    /// [`VisError::RenderFailed`] when the font holds no usable family.
    pub fn from_config(config: &RenderConfig) -> Result<Self, VisError> {
        let mut client = Self::new(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
        });
        if let Some(path) = &config.hud_font {
            let bytes = fs::read(path)?;
            client = client.with_font(bytes).map_err(VisError::render_failed)?;
            info!(font = %path.display(), "HUD font loaded");
        }
        match &config.snapshot_dir {
            Some(dir) => Ok(client.with_snapshots(dir.clone(), config.snapshot_every)?),
            None => Ok(client),
        }
    }

    /// Use a TrueType/OpenType font for text nodes
    pub fn with_font(mut self, bytes: Vec<u8>) -> Result<Self, RenderError> {
        self.hud = Some(HudText::load(bytes)?);
        Ok(self)
    }

    /// Save every `every`-th presented frame into `dir` (created if missing)
    pub fn with_snapshots(mut self, dir: impl Into<PathBuf>, every: u64) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), every, "frame snapshots enabled");
        self.snapshots = Some(Snapshots {
            dir,
            every: every.max(1),
        });
        Ok(self)
    }

    /// Last presented framebuffer
    pub fn framebuffer(&self) -> &RgbaImage {
        &self.framebuffer
    }

    /// Number of presented frames
    pub fn presented(&self) -> u64 {
        self.presented
    }

    fn rasterize(&mut self) -> Result<(), RenderError> {
        let Self {
            viewport,
            pixmap,
            nodes,
            hud,
            ..
        } = self;
        let bounds = viewport.rect();

        let mut ctx = vello_cpu::RenderContext::new(pixmap.width(), pixmap.height());
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(color_to_cpu(Rgba::BLACK));
        ctx.fill_rect(&rect_to_cpu(bounds));

        for node in nodes.iter() {
            match node {
                SceneNode::Image { frame, transform } => draw_image(&mut ctx, frame, *transform)?,
                SceneNode::Segments {
                    segments,
                    width,
                    transform,
                } => {
                    for segment in segments {
                        stroke_lines(
                            &mut ctx,
                            [segment.line],
                            segment.color,
                            *width,
                            *transform,
                            bounds,
                        );
                    }
                }
                SceneNode::Outline {
                    points,
                    color,
                    width,
                    transform,
                } => {
                    let edges = points
                        .iter()
                        .zip(points.iter().cycle().skip(1))
                        .map(|(&from, &to)| Line::new(from, to));
                    stroke_lines(&mut ctx, edges, *color, *width, *transform, bounds);
                }
                SceneNode::FillRect { rect, color } => {
                    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
                    ctx.set_paint(color_to_cpu(*color));
                    ctx.fill_rect(&rect_to_cpu(*rect));
                }
                SceneNode::Text {
                    lines,
                    origin,
                    size,
                    color,
                } => match hud.as_mut() {
                    Some(hud) => hud.draw(&mut ctx, lines, *origin, *size, *color),
                    None => debug!(lines = lines.len(), "no HUD font loaded, text skipped"),
                },
            }
        }

        ctx.flush();
        ctx.render_to_pixmap(pixmap);
        self.read_back();
        Ok(())
    }

    /// Copy the premultiplied pixmap into the straight-alpha framebuffer
    fn read_back(&mut self) {
        let src = self.pixmap.data_as_u8_slice();
        for (dst, px) in self.framebuffer.pixels_mut().zip(src.chunks_exact(4)) {
            dst.0 = unpremul_rgba8(px[0], px[1], px[2], px[3]);
        }
    }

    fn snapshot(&self) {
        let Some(snapshots) = &self.snapshots else {
            return;
        };
        if self.presented % snapshots.every != 0 {
            return;
        }

        let path = snapshots.dir.join(format!("frame_{:06}.png", self.presented));
        match self.framebuffer.save(&path) {
            Ok(()) => debug!(path = %path.display(), "snapshot written"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to write snapshot"),
        }
    }
}

fn draw_image(
    ctx: &mut vello_cpu::RenderContext,
    frame: &Frame,
    transform: Affine,
) -> Result<(), RenderError> {
    if frame.width == 0 || frame.height == 0 || transform.determinant().abs() < f64::EPSILON {
        return Ok(());
    }

    let pixmap = frame_to_pixmap(frame)?;
    ctx.set_transform(affine_to_cpu(transform));
    ctx.set_paint(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    });
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(frame.width),
        f64::from(frame.height),
    ));
    Ok(())
}

/// Stroke segments in viewport space.
///
/// Endpoints are mapped by `transform` and clipped to `bounds` grown by
/// the stroke width; segments left with nothing visible are dropped.
fn stroke_lines(
    ctx: &mut vello_cpu::RenderContext,
    lines: impl IntoIterator<Item = Line>,
    color: Rgba,
    width: f64,
    transform: Affine,
    bounds: Rect,
) {
    let bounds = bounds.inflate(width, width);
    let mut path = vello_cpu::kurbo::BezPath::new();
    for line in lines {
        let mapped = Line::new(transform * line.p0, transform * line.p1);
        if let Some(visible) = clip_line(mapped, bounds) {
            path.move_to(point_to_cpu(visible.p0));
            path.line_to(point_to_cpu(visible.p1));
        }
    }
    if path.elements().is_empty() {
        return;
    }

    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_stroke(vello_cpu::kurbo::Stroke::new(width));
    ctx.set_paint(color_to_cpu(color));
    ctx.stroke_path(&path);
}

fn frame_to_pixmap(frame: &Frame) -> Result<vello_cpu::Pixmap, RenderError> {
    let w: u16 = frame
        .width
        .try_into()
        .map_err(|_| RenderError::Backend("frame width exceeds u16".into()))?;
    let h: u16 = frame
        .height
        .try_into()
        .map_err(|_| RenderError::Backend("frame height exceeds u16".into()))?;

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(frame.width as usize * frame.height as usize);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let [r, g, b, a] = frame.pixel_rgba(x, y).unwrap_or([0, 0, 0, 0]);
            may_have_opacities |= a != 255;
            let [r, g, b, a] = premul_rgba8(r, g, b, a);
            pixels.push(vello_cpu::peniko::color::PremulRgba8 { r, g, b, a });
        }
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

fn premul_rgba8(r: u8, g: u8, b: u8, a: u8) -> [u8; 4] {
    let af = (a as u16) + 1;
    let premul = |c: u8| -> u8 { (((c as u16) * af) >> 8) as u8 };
    [premul(r), premul(g), premul(b), a]
}

fn unpremul_rgba8(r: u8, g: u8, b: u8, a: u8) -> [u8; 4] {
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let unpremul = |c: u8| -> u8 { ((c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8 };
    [unpremul(r), unpremul(g), unpremul(b), a]
}

fn color_to_cpu(c: Rgba) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

impl RenderClient for SoftwareClient {
    fn name(&self) -> &str {
        "software"
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        self.nodes.clear();
        Ok(())
    }

    fn add_node(&mut self, node: SceneNode) -> Result<NodeId, RenderError> {
        self.nodes.push(node);
        Ok(NodeId(self.nodes.len() - 1))
    }

    fn update_node(&mut self, id: NodeId, node: SceneNode) -> Result<(), RenderError> {
        let slot = self
            .nodes
            .get_mut(id.0)
            .ok_or(RenderError::UnknownNode(id))?;
        *slot = node;
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.rasterize()?;
        self.presented += 1;
        metrics::counter!("tfvis_software_frames_rasterized_total").increment(1);
        self.snapshot();
        Ok(())
    }
}
