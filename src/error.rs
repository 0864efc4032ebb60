//! Error types
//!
//! Device, encoding and feature errors, plus the crate-wide [`Error`]
//! that aggregates them.

use std::fmt;
use std::time::Duration;

use crate::device::CameraId;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by a capture device
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// The device could not be opened
    Connection { id: CameraId, reason: String },
    /// No frame arrived within the wait window
    Timeout(Duration),
    /// The device reported a hard failure mid-stream
    Acquisition(String),
    /// Operation on a device that is already closed
    Closed,
}

impl DeviceError {
    /// Whether the loop may continue after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, DeviceError::Timeout(_))
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Connection { id, reason } => {
                write!(f, "Failed to open camera {}: {}", id, reason)
            }
            DeviceError::Timeout(t) => write!(f, "No frame within {} ms", t.as_millis()),
            DeviceError::Acquisition(msg) => write!(f, "Acquisition failed: {}", msg),
            DeviceError::Closed => write!(f, "Device is closed"),
        }
    }
}

impl std::error::Error for DeviceError {}

/// Errors while turning a frame into an outbound envelope
#[derive(Debug)]
pub enum EncodeError {
    /// Pixel buffer does not match the frame dimensions
    InvalidFrame { expected: usize, actual: usize },
    /// JPEG compression failed
    Image(image::ImageError),
    /// Envelope serialization failed
    Json(serde_json::Error),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::InvalidFrame { expected, actual } => write!(
                f,
                "Frame buffer has {} bytes, expected {}",
                actual, expected
            ),
            EncodeError::Image(e) => write!(f, "JPEG encode failed: {}", e),
            EncodeError::Json(e) => write!(f, "Envelope serialization failed: {}", e),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::Image(e) => Some(e),
            EncodeError::Json(e) => Some(e),
            EncodeError::InvalidFrame { .. } => None,
        }
    }
}

impl From<image::ImageError> for EncodeError {
    fn from(err: image::ImageError) -> Self {
        EncodeError::Image(err)
    }
}

impl From<serde_json::Error> for EncodeError {
    fn from(err: serde_json::Error) -> Self {
        EncodeError::Json(err)
    }
}

/// Errors on the feature write path
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureError {
    /// No feature with this name exists on the device
    UnknownFeature(String),
    /// The feature exists but cannot be written
    NotWritable(String),
    /// The supplied value has the wrong kind
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: String,
    },
    /// Numeric value outside the feature's range
    OutOfRange { name: String, value: String },
    /// Enumeration entry not offered by the feature
    InvalidOption { name: String, value: String },
    /// Device failure while writing
    Device(DeviceError),
}

impl fmt::Display for FeatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureError::UnknownFeature(name) => write!(f, "Unknown feature: {}", name),
            FeatureError::NotWritable(name) => write!(f, "Feature is not writable: {}", name),
            FeatureError::TypeMismatch {
                name,
                expected,
                found,
            } => write!(f, "Feature {} expects {}, got {}", name, expected, found),
            FeatureError::OutOfRange { name, value } => {
                write!(f, "Value {} out of range for {}", value, name)
            }
            FeatureError::InvalidOption { name, value } => {
                write!(f, "{} is not a valid option for {}", value, name)
            }
            FeatureError::Device(e) => write!(f, "Device error: {}", e),
        }
    }
}

impl std::error::Error for FeatureError {}

impl From<DeviceError> for FeatureError {
    fn from(err: DeviceError) -> Self {
        FeatureError::Device(err)
    }
}

/// Crate-wide error
#[derive(Debug)]
pub enum Error {
    Device(DeviceError),
    Encode(EncodeError),
    Feature(FeatureError),
    /// Invalid configuration value
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Device(e) => write!(f, "{}", e),
            Error::Encode(e) => write!(f, "{}", e),
            Error::Feature(e) => write!(f, "{}", e),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Device(e) => Some(e),
            Error::Encode(e) => Some(e),
            Error::Feature(e) => Some(e),
            Error::Config(_) => None,
        }
    }
}

impl From<DeviceError> for Error {
    fn from(err: DeviceError) -> Self {
        Error::Device(err)
    }
}

impl From<EncodeError> for Error {
    fn from(err: EncodeError) -> Self {
        Error::Encode(err)
    }
}

impl From<FeatureError> for Error {
    fn from(err: FeatureError) -> Self {
        Error::Feature(err)
    }
}
