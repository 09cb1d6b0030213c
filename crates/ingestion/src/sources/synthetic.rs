//! Synthetic test pattern
//!
//! Deterministic RGBA frames: a diagonal gradient with a bright square
//! that moves a few pixels per frame. Used by tests and demos.

use bytes::Bytes;
use contracts::{Frame, FrameId, PixelFormat};

use super::CaptureBackend;
use crate::error::SourceFailure;

/// Pixels the marker square moves per frame
const MARKER_STEP: u32 = 3;

/// Synthetic pattern backend
#[derive(Debug, Clone)]
pub struct SyntheticBackend {
    width: u32,
    height: u32,
    fps: f64,
    frame_limit: Option<u64>,
    produced: u64,
}

impl SyntheticBackend {
    /// Create a pattern generator
    pub fn new(width: u32, height: u32, fps: f64, frame_limit: Option<u64>) -> Self {
        Self {
            width,
            height,
            fps,
            frame_limit,
            produced: 0,
        }
    }

    /// Render the pattern for a frame id
    pub fn render(&self, id: FrameId) -> Frame {
        let (w, h) = (self.width.max(1), self.height.max(1));
        let side = (w.min(h) / 6).max(1);
        let travel = w.saturating_sub(side).max(1);
        let marker_x = (id.get() as u32).wrapping_mul(MARKER_STEP) % travel;
        let marker_y = h.saturating_sub(side) / 2;

        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                let inside = x >= marker_x
                    && x < marker_x + side
                    && y >= marker_y
                    && y < marker_y + side;
                if inside {
                    data.extend_from_slice(&[250, 250, 250, 255]);
                } else {
                    let r = (x * 255 / w) as u8;
                    let g = (y * 255 / h) as u8;
                    data.extend_from_slice(&[r, g, 96, 255]);
                }
            }
        }

        let timestamp = if self.fps > 0.0 {
            (id.get().saturating_sub(1)) as f64 / self.fps
        } else {
            0.0
        };

        Frame {
            id,
            timestamp,
            width: w,
            height: h,
            format: PixelFormat::Rgba8,
            data: Bytes::from(data),
        }
    }
}

impl CaptureBackend for SyntheticBackend {
    fn describe(&self) -> String {
        format!("synthetic:{}x{}", self.width, self.height)
    }

    fn open(&mut self) -> Result<(), SourceFailure> {
        if self.width == 0 || self.height == 0 {
            return Err(SourceFailure::unavailable("zero-sized synthetic pattern"));
        }
        self.produced = 0;
        Ok(())
    }

    fn capture(&mut self, id: FrameId) -> Result<Option<Frame>, SourceFailure> {
        if self.frame_limit.is_some_and(|limit| self.produced >= limit) {
            return Ok(None);
        }
        self.produced += 1;
        Ok(Some(self.render(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_deterministic_and_moves() {
        let backend = SyntheticBackend::new(64, 48, 30.0, None);
        let a = backend.render(FrameId::new(1));
        let b = backend.render(FrameId::new(1));
        let c = backend.render(FrameId::new(5));

        assert!(a.is_well_formed());
        assert_eq!(a.data, b.data);
        assert_ne!(a.data, c.data);
        assert!((c.timestamp - 4.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_frame_limit() {
        let mut backend = SyntheticBackend::new(8, 8, 30.0, Some(2));
        backend.open().unwrap();
        assert!(backend.capture(FrameId::new(1)).unwrap().is_some());
        assert!(backend.capture(FrameId::new(2)).unwrap().is_some());
        assert!(backend.capture(FrameId::new(3)).unwrap().is_none());
    }

    #[test]
    fn test_zero_size_fails_to_open() {
        let mut backend = SyntheticBackend::new(0, 8, 30.0, None);
        assert!(matches!(
            backend.open(),
            Err(SourceFailure::Unavailable { .. })
        ));
    }
}
