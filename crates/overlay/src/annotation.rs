//! Descriptor → scene nodes
//!
//! Only this module interprets `TransformDescriptor`. Every node is built
//! in image space and carries the image→viewport transform.

use contracts::{
    ColoredLine, FlowResult, FlowVector, Frame, Rgba, SceneNode, TrackedRegion,
    TransformDescriptor,
};
use kurbo::{Affine, Line, Point, Vec2};
use tracing::debug;

use crate::geometry::{grid_points, Homography};

/// Stroke width of annotation lines (viewport pixels)
pub const STROKE_WIDTH: f64 = 2.0;

/// Arrow head half-angle (radians)
const HEAD_ANGLE: f64 = 0.45;

/// Longest arrow head edge (image pixels)
const HEAD_MAX: f64 = 6.0;

/// Color for a confidence value
pub fn confidence_color(confidence: f32) -> Rgba {
    match confidence {
        c if c < 0.4 => Rgba::RED,
        c if c < 0.7 => Rgba::AMBER,
        _ => Rgba::GREEN,
    }
}

/// Build annotation nodes for a result.
///
/// Returns no nodes when the descriptor cannot be drawn; the pair is then
/// presented unannotated.
pub fn annotate(result: &FlowResult, frame: &Frame, grid: u32, to_view: Affine) -> Vec<SceneNode> {
    let color = confidence_color(result.confidence);
    let (w, h) = (frame.width as f64, frame.height as f64);

    match &result.descriptor {
        TransformDescriptor::Homography(coeffs) => match Homography::from_row_major(coeffs) {
            Some(hom) => warp_nodes(&hom, w, h, grid, color, to_view),
            None => Vec::new(),
        },
        TransformDescriptor::Affine(coeffs) => {
            let hom = Homography::from_affine(Affine::new(*coeffs));
            warp_nodes(&hom, w, h, grid, color, to_view)
        }
        TransformDescriptor::VectorField(vectors) => vector_nodes(vectors, to_view),
        TransformDescriptor::Regions(regions) => region_nodes(regions, color, to_view),
        TransformDescriptor::Raw(bytes) => {
            debug!(
                frame_id = frame.id.get(),
                len = bytes.len(),
                "raw descriptor, drawing unannotated"
            );
            Vec::new()
        }
    }
}

/// Warped outline plus displacement grid
fn warp_nodes(
    hom: &Homography,
    width: f64,
    height: f64,
    grid: u32,
    color: Rgba,
    to_view: Affine,
) -> Vec<SceneNode> {
    let corners = [
        Point::new(0.0, 0.0),
        Point::new(width, 0.0),
        Point::new(width, height),
        Point::new(0.0, height),
    ];
    let outline: Option<Vec<Point>> = corners.iter().map(|&p| hom.map(p)).collect();

    let mut segments = Vec::new();
    if grid > 0 {
        for origin in grid_points(width, height, grid) {
            if let Some(target) = hom.map(origin) {
                push_arrow(&mut segments, origin, target, color.with_alpha(200));
            }
        }
    }

    let mut nodes = Vec::with_capacity(2);
    if let Some(points) = outline {
        nodes.push(SceneNode::Outline {
            points,
            color: Rgba::CYAN,
            width: STROKE_WIDTH,
            transform: to_view,
        });
    }
    if !segments.is_empty() {
        nodes.push(SceneNode::Segments {
            segments,
            width: STROKE_WIDTH,
            transform: to_view,
        });
    }
    nodes
}

/// One arrow per vector, colored by its own confidence
fn vector_nodes(vectors: &[FlowVector], to_view: Affine) -> Vec<SceneNode> {
    let mut segments = Vec::with_capacity(vectors.len() * 3);
    for v in vectors {
        let origin = Point::new(v.x, v.y);
        let target = origin + Vec2::new(v.dx, v.dy);
        if origin.is_finite() && target.is_finite() {
            push_arrow(&mut segments, origin, target, confidence_color(v.confidence));
        }
    }

    if segments.is_empty() {
        return Vec::new();
    }
    vec![SceneNode::Segments {
        segments,
        width: STROKE_WIDTH,
        transform: to_view,
    }]
}

/// Region outlines at the source position plus displacement arrows
fn region_nodes(regions: &[TrackedRegion], color: Rgba, to_view: Affine) -> Vec<SceneNode> {
    let mut nodes = Vec::with_capacity(regions.len() + 1);
    let mut arrows = Vec::new();

    for region in regions {
        let (x0, y0) = (region.x, region.y);
        let (x1, y1) = (x0 + region.width, y0 + region.height);
        nodes.push(SceneNode::Outline {
            points: vec![
                Point::new(x0, y0),
                Point::new(x1, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ],
            color,
            width: STROKE_WIDTH,
            transform: to_view,
        });

        let center = Point::new((x0 + x1) / 2.0, (y0 + y1) / 2.0);
        push_arrow(
            &mut arrows,
            center,
            center + Vec2::new(region.dx, region.dy),
            Rgba::WHITE,
        );
    }

    if !arrows.is_empty() {
        nodes.push(SceneNode::Segments {
            segments: arrows,
            width: STROKE_WIDTH,
            transform: to_view,
        });
    }
    nodes
}

/// Shaft plus two head strokes. Zero-length arrows are skipped.
fn push_arrow(out: &mut Vec<ColoredLine>, from: Point, to: Point, color: Rgba) {
    let shaft = to - from;
    let len = shaft.hypot();
    if len < 1e-6 {
        return;
    }

    out.push(ColoredLine {
        line: Line::new(from, to),
        color,
    });

    let head = (len * 0.35).min(HEAD_MAX);
    let back = -shaft / len * head;
    for angle in [HEAD_ANGLE, -HEAD_ANGLE] {
        let (s, c) = angle.sin_cos();
        let edge = Vec2::new(back.x * c - back.y * s, back.x * s + back.y * c);
        out.push(ColoredLine {
            line: Line::new(to, to + edge),
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{FrameId, PixelFormat};

    fn frame() -> Frame {
        Frame {
            id: FrameId::new(1),
            timestamp: 0.0,
            width: 100,
            height: 50,
            format: PixelFormat::Gray8,
            data: Bytes::from(vec![0u8; 5000]),
        }
    }

    fn result(descriptor: TransformDescriptor) -> FlowResult {
        FlowResult::new(FrameId::new(1), descriptor, 0.9)
    }

    fn segment_count(nodes: &[SceneNode]) -> usize {
        nodes
            .iter()
            .map(|n| match n {
                SceneNode::Segments { segments, .. } => segments.len(),
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn test_homography_outline_and_grid() {
        let translate = [1.0, 0.0, 10.0, 0.0, 1.0, 5.0, 0.0, 0.0, 1.0];
        let nodes = annotate(
            &result(TransformDescriptor::Homography(translate)),
            &frame(),
            4,
            Affine::IDENTITY,
        );

        match &nodes[0] {
            SceneNode::Outline { points, .. } => {
                assert_eq!(points[0], Point::new(10.0, 5.0));
                assert_eq!(points[2], Point::new(110.0, 55.0));
            }
            other => panic!("expected outline, got {}", other.kind()),
        }
        // 16 arrows, 3 strokes each
        assert_eq!(segment_count(&nodes), 48);
    }

    #[test]
    fn test_identity_draws_outline_only() {
        let nodes = annotate(
            &result(TransformDescriptor::Homography(
                TransformDescriptor::IDENTITY_HOMOGRAPHY,
            )),
            &frame(),
            4,
            Affine::IDENTITY,
        );
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind(), "outline");
    }

    #[test]
    fn test_vector_colors_follow_confidence() {
        let vectors = vec![
            FlowVector {
                x: 10.0,
                y: 10.0,
                dx: 5.0,
                dy: 0.0,
                confidence: 0.1,
            },
            FlowVector {
                x: 20.0,
                y: 10.0,
                dx: 0.0,
                dy: 5.0,
                confidence: 0.95,
            },
        ];
        let nodes = annotate(
            &result(TransformDescriptor::VectorField(vectors)),
            &frame(),
            4,
            Affine::IDENTITY,
        );

        let SceneNode::Segments { segments, .. } = &nodes[0] else {
            panic!("expected segments");
        };
        assert_eq!(segments.len(), 6);
        assert_eq!(segments[0].color, Rgba::RED);
        assert_eq!(segments[3].color, Rgba::GREEN);
    }

    #[test]
    fn test_regions() {
        let regions = vec![TrackedRegion {
            x: 10.0,
            y: 10.0,
            width: 20.0,
            height: 10.0,
            dx: 4.0,
            dy: 0.0,
            label: Some("car".to_string()),
        }];
        let nodes = annotate(
            &result(TransformDescriptor::Regions(regions)),
            &frame(),
            4,
            Affine::IDENTITY,
        );
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].kind(), "outline");
        assert_eq!(segment_count(&nodes), 3);
    }

    #[test]
    fn test_raw_and_degenerate_are_unannotated() {
        let raw = annotate(
            &result(TransformDescriptor::Raw(Bytes::from_static(b"xyz"))),
            &frame(),
            4,
            Affine::IDENTITY,
        );
        assert!(raw.is_empty());

        let nan = annotate(
            &result(TransformDescriptor::Homography([f64::NAN; 9])),
            &frame(),
            4,
            Affine::IDENTITY,
        );
        assert!(nan.is_empty());
    }

    #[test]
    fn test_confidence_color_bands() {
        assert_eq!(confidence_color(0.0), Rgba::RED);
        assert_eq!(confidence_color(0.5), Rgba::AMBER);
        assert_eq!(confidence_color(1.0), Rgba::GREEN);
    }
}
