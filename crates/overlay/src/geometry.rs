//! Image-space geometry helpers
//!
//! Annotations are built in image pixel coordinates and drawn with the
//! same image→viewport affine as the frame itself.

use contracts::Viewport;
use kurbo::{Affine, Line, Point, Rect, Vec2};
use nalgebra::{Matrix3, Vector3};

/// Below this magnitude the projective divisor is treated as zero
const W_EPSILON: f64 = 1e-9;

/// Affine fitting an image into the viewport, aspect preserved and
/// centered (letterbox / pillarbox).
pub fn letterbox(image_width: u32, image_height: u32, viewport: Viewport) -> Affine {
    if image_width == 0 || image_height == 0 || viewport.width == 0 || viewport.height == 0 {
        return Affine::IDENTITY;
    }

    let (iw, ih) = (image_width as f64, image_height as f64);
    let (vw, vh) = (viewport.width as f64, viewport.height as f64);
    let scale = (vw / iw).min(vh / ih);
    let offset = Vec2::new((vw - iw * scale) / 2.0, (vh - ih * scale) / 2.0);

    Affine::scale(scale).then_translate(offset)
}

/// Projective transform in image space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(Matrix3<f64>);

impl Homography {
    /// Build from a row-major 3x3 matrix.
    ///
    /// Returns `None` when any coefficient is not finite.
    pub fn from_row_major(coeffs: &[f64; 9]) -> Option<Self> {
        if coeffs.iter().all(|c| c.is_finite()) {
            Some(Self(Matrix3::from_row_slice(coeffs)))
        } else {
            None
        }
    }

    /// Lift a 2D affine into a homography
    pub fn from_affine(affine: Affine) -> Self {
        let [a, b, c, d, e, f] = affine.as_coeffs();
        Self(Matrix3::new(a, c, e, b, d, f, 0.0, 0.0, 1.0))
    }

    /// Map a point; `None` when it maps to infinity
    pub fn map(&self, p: Point) -> Option<Point> {
        let v = self.0 * Vector3::new(p.x, p.y, 1.0);
        if v.z.abs() < W_EPSILON {
            return None;
        }
        let mapped = Point::new(v.x / v.z, v.y / v.z);
        (mapped.x.is_finite() && mapped.y.is_finite()).then_some(mapped)
    }
}

/// Sample points at the centers of a `steps` x `steps` grid
pub fn grid_points(width: f64, height: f64, steps: u32) -> impl Iterator<Item = Point> {
    let steps = steps.max(1);
    let (cw, ch) = (width / steps as f64, height / steps as f64);
    (0..steps).flat_map(move |j| {
        (0..steps).map(move |i| Point::new((i as f64 + 0.5) * cw, (j as f64 + 0.5) * ch))
    })
}

/// Clip a segment to `bounds` (Liang-Barsky).
///
/// Returns `None` when the segment lies entirely outside or has a
/// non-finite endpoint.
pub fn clip_line(line: Line, bounds: Rect) -> Option<Line> {
    let (p0, p1) = (line.p0, line.p1);
    if !p0.is_finite() || !p1.is_finite() {
        return None;
    }

    let d = p1 - p0;
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [
        (-d.x, p0.x - bounds.x0),
        (d.x, bounds.x1 - p0.x),
        (-d.y, p0.y - bounds.y0),
        (d.y, bounds.y1 - p0.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }

    Some(Line::new(p0 + d * t0, p0 + d * t1))
}
