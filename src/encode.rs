//! Frame encoding
//!
//! Each captured frame is compressed once to JPEG, base64-wrapped into a
//! [`FrameEnvelope`] and serialized. The resulting `Bytes` are shared by
//! every sink of the session.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::device::Frame;
use crate::error::EncodeError;
use crate::sink::FrameEnvelope;

/// JPEG + envelope encoder
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    quality: u8,
}

impl FrameEncoder {
    /// Create an encoder; quality is clamped to 1..=100
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Compress a frame to JPEG
    pub fn encode_jpeg(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError> {
        if !frame.is_well_formed() {
            return Err(EncodeError::InvalidFrame {
                expected: frame.expected_len(),
                actual: frame.pixels.len(),
            });
        }

        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, self.quality).encode(
            &frame.pixels,
            frame.width,
            frame.height,
            ExtendedColorType::Rgb8,
        )?;
        Ok(buffer)
    }

    /// Encode a frame into the serialized envelope sent to viewers
    pub fn encode(&self, frame: &Frame) -> Result<Bytes, EncodeError> {
        let jpeg = self.encode_jpeg(frame)?;
        FrameEnvelope::from_jpeg(&jpeg).to_bytes()
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(75)
    }
}
