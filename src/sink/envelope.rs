//! Outbound message envelope
//!
//! Every frame goes to viewers as a flat JSON object with a single key:
//!
//! ```text
//! {"image": "<base64 JPEG>"}
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::EncodeError;

/// Message pushed to viewers for each frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEnvelope {
    /// Base64-encoded JPEG bytes
    pub image: String,
}

impl FrameEnvelope {
    /// Wrap compressed image bytes
    pub fn from_jpeg(jpeg: &[u8]) -> Self {
        Self {
            image: STANDARD.encode(jpeg),
        }
    }

    /// Serialize to the wire form
    pub fn to_bytes(&self) -> Result<Bytes, EncodeError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Parse the wire form
    pub fn from_slice(data: &[u8]) -> Result<Self, EncodeError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Decode the image payload back into JPEG bytes
    pub fn jpeg(&self) -> Option<Vec<u8>> {
        STANDARD.decode(&self.image).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_form_is_single_key_object() {
        let envelope = FrameEnvelope::from_jpeg(&[0xFF, 0xD8, 0xFF, 0xD9]);
        let bytes = envelope.to_bytes().unwrap();

        assert_eq!(&bytes[..], br#"{"image":"/9j/2Q=="}"#);

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_and_decode() {
        let parsed = FrameEnvelope::from_slice(br#"{"image":"/9j/2Q=="}"#).unwrap();
        assert_eq!(parsed.jpeg().unwrap(), vec![0xFF, 0xD8, 0xFF, 0xD9]);

        assert!(FrameEnvelope::from_slice(b"not json").is_err());
    }
}
