//! Capture device contract
//!
//! A stream session owns exactly one [`CaptureDevice`] for its lifetime. The
//! device is obtained from a [`DeviceOpener`] on the session's acquisition
//! worker, so opening, grabbing and closing all happen on that one thread.
//!
//! Devices always run in latest-only mode: at most one pending frame is held,
//! and anything captured while the previous frame is still being processed is
//! discarded rather than queued. [`LatestFrameSlot`] is the building block
//! for that policy.

pub mod frame;
pub mod simulated;
pub mod slot;

use std::time::Duration;

use crate::error::DeviceError;

pub use frame::Frame;
pub use simulated::{DeviceCounters, SimulatedCamera, SimulatedOpener, SimulatedProfile};
pub use slot::{LatestFrameSlot, SlotRecv};

/// Camera identity (serial number)
///
/// Compared exactly and case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraId(String);

impl CameraId {
    /// Create a new camera identity
    pub fn new(serial: impl Into<String>) -> Self {
        Self(serial.into())
    }

    /// The serial number string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CameraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CameraId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CameraId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An opened camera connection
///
/// All methods may block. Implementations must honor the latest-only policy:
/// never buffer more than one pending frame.
pub trait CaptureDevice: Send + 'static {
    /// Begin continuous latest-only acquisition
    fn start_acquisition(&mut self) -> Result<(), DeviceError>;

    /// Whether the device is still delivering frames
    fn is_acquiring(&self) -> bool;

    /// Wait up to `timeout` for the most recent frame
    ///
    /// Returns [`DeviceError::Timeout`] when nothing arrived in time, and
    /// [`DeviceError::Acquisition`] on a hard device failure.
    fn retrieve_frame(&mut self, timeout: Duration) -> Result<Frame, DeviceError>;

    /// Whether the connection is still open
    fn is_open(&self) -> bool;

    /// Close the connection. Must be idempotent.
    fn close(&mut self);
}

/// Opens devices by identity
pub trait DeviceOpener: Send + Sync + 'static {
    type Device: CaptureDevice;

    /// Open the camera with the given serial number
    fn open(&self, id: &CameraId) -> Result<Self::Device, DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_id_is_case_sensitive() {
        assert_eq!(CameraId::new("CAM1"), CameraId::from("CAM1"));
        assert_ne!(CameraId::new("CAM1"), CameraId::new("cam1"));
        assert_eq!(CameraId::new("22334455").to_string(), "22334455");
    }
}
