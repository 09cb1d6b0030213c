//! Synthetic analyzer
//!
//! Deterministic stand-in for the transform flow library. Produces smooth,
//! frame-dependent descriptors so the overlay has something to draw. It
//! does not look at pixel content.

use std::collections::VecDeque;

use contracts::{
    DescriptorKind, FlowResult, FlowVector, Frame, TrackedRegion, TransformDescriptor,
};

use super::FlowAnalyzer;
use crate::error::AnalysisFault;

/// Vectors per axis in generated vector fields
const FIELD_STEPS: u32 = 6;

/// Synthetic analyzer configuration
#[derive(Debug, Clone, Default)]
pub struct SyntheticAnalyzerConfig {
    /// Frames held back before a result is released
    pub latency_frames: u64,
    /// Every n-th result is invalid (0 = never)
    pub invalid_every: u64,
    /// Descriptor shape to produce
    pub descriptor: DescriptorKind,
    /// Fail fatally once this many frames were analyzed
    pub fail_after: Option<u64>,
}

/// Deterministic analyzer
#[derive(Debug)]
pub struct SyntheticAnalyzer {
    config: SyntheticAnalyzerConfig,
    held: VecDeque<FlowResult>,
    analyzed: u64,
}

impl SyntheticAnalyzer {
    /// Create analyzer
    pub fn new(config: SyntheticAnalyzerConfig) -> Self {
        Self {
            config,
            held: VecDeque::new(),
            analyzed: 0,
        }
    }

    /// Result the analyzer computes for a frame
    pub fn estimate(&self, frame: &Frame) -> FlowResult {
        let seq = self.analyzed;
        if self.config.invalid_every > 0 && seq % self.config.invalid_every == 0 {
            return FlowResult::invalid(frame.id);
        }

        let phase = frame.id.get() as f64 * 0.15;
        let descriptor = match self.config.descriptor {
            DescriptorKind::Homography => homography(frame, phase),
            DescriptorKind::VectorField => vector_field(frame, phase),
            DescriptorKind::Regions => regions(frame, phase),
        };
        let confidence = 0.55 + 0.4 * phase.sin().abs() as f32;

        FlowResult::new(frame.id, descriptor, confidence)
    }

    /// Frames analyzed so far
    pub fn analyzed(&self) -> u64 {
        self.analyzed
    }
}

impl FlowAnalyzer for SyntheticAnalyzer {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn analyze(&mut self, frame: &Frame) -> Result<Vec<FlowResult>, AnalysisFault> {
        if self.config.fail_after.is_some_and(|limit| self.analyzed >= limit) {
            return Err(AnalysisFault::new(
                "synthetic",
                format!("scripted failure after {} frames", self.analyzed),
            ));
        }

        self.analyzed += 1;
        let result = self.estimate(frame);
        self.held.push_back(result);

        let ready = self
            .held
            .len()
            .saturating_sub(self.config.latency_frames as usize);
        Ok(self.held.drain(..ready).collect())
    }

    fn flush(&mut self) -> Vec<FlowResult> {
        self.held.drain(..).collect()
    }
}

/// Slow rotation about the image center plus a small drift
fn homography(frame: &Frame, phase: f64) -> TransformDescriptor {
    let (cx, cy) = (frame.width as f64 / 2.0, frame.height as f64 / 2.0);
    let angle = 0.04 * phase.sin();
    let scale = 1.0 + 0.03 * (phase * 0.5).cos();
    let (s, c) = angle.sin_cos();
    let (a, b) = (scale * c, scale * s);
    let tx = cx - a * cx + b * cy + 4.0 * phase.cos();
    let ty = cy - b * cx - a * cy + 3.0 * phase.sin();

    TransformDescriptor::Homography([a, -b, tx, b, a, ty, 1e-6 * phase.sin(), 0.0, 1.0])
}

/// Swirl around the image center
fn vector_field(frame: &Frame, phase: f64) -> TransformDescriptor {
    let (w, h) = (frame.width as f64, frame.height as f64);
    let (cx, cy) = (w / 2.0, h / 2.0);
    let strength = 0.08 * (1.0 + phase.sin());

    let mut vectors = Vec::with_capacity((FIELD_STEPS * FIELD_STEPS) as usize);
    for j in 0..FIELD_STEPS {
        for i in 0..FIELD_STEPS {
            let x = (i as f64 + 0.5) * w / FIELD_STEPS as f64;
            let y = (j as f64 + 0.5) * h / FIELD_STEPS as f64;
            let (rx, ry) = (x - cx, y - cy);
            let radius = (rx * rx + ry * ry).sqrt() / cx.max(cy).max(1.0);
            vectors.push(FlowVector {
                x,
                y,
                dx: -ry * strength,
                dy: rx * strength,
                confidence: (1.0 - radius.min(1.0) * 0.7) as f32,
            });
        }
    }

    TransformDescriptor::VectorField(vectors)
}

/// Two boxes bouncing horizontally
fn regions(frame: &Frame, phase: f64) -> TransformDescriptor {
    let (w, h) = (frame.width as f64, frame.height as f64);
    let size = (w.min(h) / 5.0).max(1.0);
    let dx = 6.0 * phase.cos();

    let tracked = (0..2)
        .map(|k| {
            let lane = k as f64;
            TrackedRegion {
                x: (w - size) * (0.5 + 0.35 * (phase + lane * 2.0).sin()),
                y: h * (0.25 + 0.4 * lane),
                width: size,
                height: size * 0.75,
                dx: if k == 0 { dx } else { -dx },
                dy: 0.0,
                label: Some(format!("track-{}", k + 1)),
            }
        })
        .collect();

    TransformDescriptor::Regions(tracked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SyntheticBackend;
    use contracts::FrameId;

    fn frame(id: u64) -> Frame {
        SyntheticBackend::new(32, 24, 30.0, None).render(FrameId::new(id))
    }

    fn analyzer(latency_frames: u64, invalid_every: u64) -> SyntheticAnalyzer {
        SyntheticAnalyzer::new(SyntheticAnalyzerConfig {
            latency_frames,
            invalid_every,
            ..Default::default()
        })
    }

    #[test]
    fn test_latency_holds_results_back() {
        let mut analyzer = analyzer(2, 0);
        assert!(analyzer.analyze(&frame(1)).unwrap().is_empty());
        assert!(analyzer.analyze(&frame(2)).unwrap().is_empty());

        let ready = analyzer.analyze(&frame(3)).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].frame_id, FrameId::new(1));

        let rest: Vec<u64> = analyzer.flush().iter().map(|r| r.frame_id.get()).collect();
        assert_eq!(rest, vec![2, 3]);
    }

    #[test]
    fn test_invalid_every() {
        let mut analyzer = analyzer(0, 3);
        let valid: Vec<bool> = (1..=6)
            .map(|id| analyzer.analyze(&frame(id)).unwrap()[0].valid)
            .collect();
        assert_eq!(valid, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn test_fail_after() {
        let mut analyzer = SyntheticAnalyzer::new(SyntheticAnalyzerConfig {
            fail_after: Some(1),
            ..Default::default()
        });
        assert!(analyzer.analyze(&frame(1)).is_ok());
        assert!(analyzer.analyze(&frame(2)).is_err());
    }

    #[test]
    fn test_descriptor_shapes() {
        for (kind, expected) in [
            (DescriptorKind::Homography, "homography"),
            (DescriptorKind::VectorField, "vector_field"),
            (DescriptorKind::Regions, "regions"),
        ] {
            let mut analyzer = SyntheticAnalyzer::new(SyntheticAnalyzerConfig {
                descriptor: kind,
                ..Default::default()
            });
            let result = analyzer.analyze(&frame(4)).unwrap().remove(0);
            assert_eq!(result.descriptor.kind(), expected);
            assert!((0.0..=1.0).contains(&result.confidence));
        }
    }
}
