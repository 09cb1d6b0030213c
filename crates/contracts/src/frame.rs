//! Frame - FrameSource output
//!
//! A single captured image with its sequence number and capture time.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic frame sequence number.
///
/// Assigned by the frame source at capture time. Ids are strictly
/// increasing within one source and never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(u64);

impl FrameId {
    /// Create a frame id from its raw sequence number
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw sequence number
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id following this one
    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u64> for FrameId {
    #[inline]
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Pixel layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
    Bgra8,
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Captured video frame
///
/// The pixel buffer is a `Bytes` handle: the source owns the only handle
/// until the frame is handed to the synchronizer, after which clones share
/// the same read-only allocation with the renderer.
#[derive(Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Sequence number (strictly increasing per source)
    pub id: FrameId,

    /// Capture timestamp (seconds since the source started)
    pub timestamp: f64,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Pixel layout
    pub format: PixelFormat,

    /// Pixel data, row-major, tightly packed
    pub data: Bytes,
}

impl Frame {
    /// Expected buffer length for the frame's dimensions and format
    #[inline]
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Whether the buffer length matches the declared dimensions
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.expected_len()
    }

    /// Read one pixel as RGBA. Returns `None` outside the image or when
    /// the buffer is short.
    pub fn pixel_rgba(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = (y as usize * self.width as usize + x as usize) * bpp;
        let px = self.data.get(offset..offset + bpp)?;
        Some(match self.format {
            PixelFormat::Rgb8 => [px[0], px[1], px[2], 255],
            PixelFormat::Rgba8 => [px[0], px[1], px[2], px[3]],
            PixelFormat::Bgra8 => [px[2], px[1], px[0], px[3]],
            PixelFormat::Gray8 => [px[0], px[0], px[0], 255],
        })
    }
}

// Pixel data is deliberately left out of Debug output
impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(format: PixelFormat, data: Vec<u8>) -> Frame {
        Frame {
            id: FrameId::new(1),
            timestamp: 0.0,
            width: 2,
            height: 1,
            format,
            data: Bytes::from(data),
        }
    }

    #[test]
    fn test_frame_id_ordering() {
        let a = FrameId::new(3);
        assert!(a < a.next());
        assert_eq!(a.next().get(), 4);
        assert_eq!(a.to_string(), "#3");
    }

    #[test]
    fn test_pixel_rgba_bgra_swaps_channels() {
        let f = frame(PixelFormat::Bgra8, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(f.is_well_formed());
        assert_eq!(f.pixel_rgba(0, 0), Some([3, 2, 1, 4]));
        assert_eq!(f.pixel_rgba(1, 0), Some([7, 6, 5, 8]));
        assert_eq!(f.pixel_rgba(2, 0), None);
    }

    #[test]
    fn test_short_buffer_is_detected() {
        let f = frame(PixelFormat::Rgb8, vec![0; 4]);
        assert!(!f.is_well_formed());
        assert_eq!(f.pixel_rgba(1, 0), None);
    }

    #[test]
    fn test_serde_frame_id_is_transparent() {
        let json = serde_json::to_string(&FrameId::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
