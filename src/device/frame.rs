//! Decoded camera frames

use std::time::Instant;

use bytes::Bytes;

/// A decoded frame in packed RGB8
///
/// Cheap to clone: the pixel buffer is reference counted.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Packed RGB8 pixel data, row-major
    pub pixels: Bytes,
    /// Capture sequence number assigned by the device
    pub sequence: u64,
    /// When the device captured the frame
    pub captured_at: Instant,
}

impl Frame {
    /// Create an RGB8 frame captured now
    pub fn rgb8(width: u32, height: u32, pixels: Bytes, sequence: u64) -> Self {
        Self {
            width,
            height,
            pixels,
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Number of bytes a well-formed buffer must hold
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Whether the pixel buffer matches the dimensions
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.pixels.len() == self.expected_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed() {
        let frame = Frame::rgb8(4, 2, Bytes::from(vec![0u8; 24]), 1);
        assert_eq!(frame.expected_len(), 24);
        assert!(frame.is_well_formed());

        let short = Frame::rgb8(4, 2, Bytes::from(vec![0u8; 10]), 2);
        assert!(!short.is_well_formed());

        let empty = Frame::rgb8(0, 0, Bytes::new(), 3);
        assert!(!empty.is_well_formed());
    }
}
