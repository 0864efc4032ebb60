//! In-process simulated camera
//!
//! Produces a moving test pattern on its own capture thread at a fixed rate,
//! feeding a [`LatestFrameSlot`] so that retrieval is latest-only exactly like
//! a hardware camera in "latest image only" grab mode. Faults can be injected
//! per camera identity (refuse to open, fail after N frames, stall, fail on
//! demand) and every open/close is counted so callers can verify the device
//! lifecycle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;

use crate::error::{DeviceError, FeatureError};
use crate::features::{FeatureDescriptor, FeatureMap, FeatureTable, FeatureValue};

use super::frame::Frame;
use super::slot::{LatestFrameSlot, SlotRecv};
use super::{CameraId, CaptureDevice, DeviceOpener};

/// Behavior of a simulated camera
#[derive(Debug, Clone)]
pub struct SimulatedProfile {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Time between captures on the device side
    pub capture_interval: Duration,
    /// Refuse to open
    pub fail_open: bool,
    /// Report a hard acquisition failure after this many retrieved frames
    pub fail_after_frames: Option<u64>,
    /// Never produce a frame
    pub stalled: bool,
    /// Time `close` takes to release the connection
    pub close_delay: Duration,
}

impl Default for SimulatedProfile {
    fn default() -> Self {
        Self {
            width: 64,
            height: 48,
            capture_interval: Duration::from_millis(5),
            fail_open: false,
            fail_after_frames: None,
            stalled: false,
            close_delay: Duration::ZERO,
        }
    }
}

impl SimulatedProfile {
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn capture_interval(mut self, interval: Duration) -> Self {
        self.capture_interval = interval;
        self
    }

    pub fn fail_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn fail_after_frames(mut self, frames: u64) -> Self {
        self.fail_after_frames = Some(frames);
        self
    }

    pub fn stalled(mut self) -> Self {
        self.stalled = true;
        self
    }

    pub fn close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }
}

/// Lifecycle counters for one camera identity
#[derive(Debug, Default)]
pub struct DeviceCounters {
    opens: AtomicU64,
    closes: AtomicU64,
    open_now: AtomicI64,
    max_open: AtomicI64,
    retrieved: AtomicU64,
    fault: AtomicBool,
}

impl DeviceCounters {
    /// Successful opens
    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Closes of previously opened connections
    pub fn closes(&self) -> u64 {
        self.closes.load(Ordering::SeqCst)
    }

    /// Connections currently open
    pub fn open_now(&self) -> i64 {
        self.open_now.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open connections ever seen
    pub fn max_concurrent_opens(&self) -> i64 {
        self.max_open.load(Ordering::SeqCst)
    }

    /// Frames handed out by `retrieve_frame`
    pub fn retrieved(&self) -> u64 {
        self.retrieved.load(Ordering::SeqCst)
    }

    fn on_open(&self) {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let now = self.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(now, Ordering::SeqCst);
    }

    fn on_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.open_now.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Opens [`SimulatedCamera`]s
#[derive(Debug, Default)]
pub struct SimulatedOpener {
    default_profile: SimulatedProfile,
    profiles: Mutex<HashMap<CameraId, SimulatedProfile>>,
    counters: Mutex<HashMap<CameraId, Arc<DeviceCounters>>>,
    nodes: Mutex<HashMap<CameraId, Arc<Mutex<FeatureTable>>>>,
}

impl SimulatedOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `profile` for every camera without an explicit override
    pub fn with_default_profile(profile: SimulatedProfile) -> Self {
        Self {
            default_profile: profile,
            ..Default::default()
        }
    }

    /// Override the profile for one camera. Applies to the next open.
    pub fn set_profile(&self, id: impl Into<CameraId>, profile: SimulatedProfile) {
        self.profiles
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(id.into(), profile);
    }

    /// Drop the override for one camera
    pub fn clear_profile(&self, id: &CameraId) {
        self.profiles
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(id);
    }

    /// Lifecycle counters for a camera (created on first use)
    pub fn counters(&self, id: &CameraId) -> Arc<DeviceCounters> {
        let mut counters = self.counters.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(counters.entry(id.clone()).or_default())
    }

    /// Feature node map of a camera, kept across connections
    fn nodes(&self, id: &CameraId, profile: &SimulatedProfile) -> Arc<Mutex<FeatureTable>> {
        let mut nodes = self.nodes.lock().unwrap_or_else(|p| p.into_inner());
        let table = nodes
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(default_nodes(profile))));
        Arc::clone(table)
    }

    /// Make the camera's open connection fail on its next retrieve
    pub fn inject_fault(&self, id: &CameraId) {
        self.counters(id).fault.store(true, Ordering::SeqCst);
    }

    fn profile(&self, id: &CameraId) -> SimulatedProfile {
        self.profiles
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(id)
            .cloned()
            .unwrap_or_else(|| self.default_profile.clone())
    }
}

impl DeviceOpener for SimulatedOpener {
    type Device = SimulatedCamera;

    fn open(&self, id: &CameraId) -> Result<SimulatedCamera, DeviceError> {
        let profile = self.profile(id);
        if profile.fail_open {
            return Err(DeviceError::Connection {
                id: id.clone(),
                reason: "no device with this serial number".to_string(),
            });
        }

        let counters = self.counters(id);
        counters.fault.store(false, Ordering::SeqCst);
        counters.on_open();
        let features = self.nodes(id, &profile);

        tracing::debug!(camera = %id, "Simulated camera opened");
        Ok(SimulatedCamera::new(id.clone(), profile, counters, features))
    }
}

fn default_nodes(profile: &SimulatedProfile) -> FeatureTable {
    FeatureTable::new()
        .with(FeatureDescriptor::float("Gain", 0.0, 0.0, 24.0))
        .with(FeatureDescriptor::float("ExposureTime", 5000.0, 20.0, 1_000_000.0))
        .with(FeatureDescriptor::enumeration(
            "PixelFormat",
            "RGB8",
            &["Mono8", "RGB8", "BayerRG8"],
        ))
        .with(FeatureDescriptor::boolean("ReverseX", false))
        .with(FeatureDescriptor::integer("Width", profile.width as i64, 16, 4096).read_only())
}

/// A simulated camera connection
pub struct SimulatedCamera {
    id: CameraId,
    profile: SimulatedProfile,
    slot: Arc<LatestFrameSlot<Frame>>,
    producing: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
    counters: Arc<DeviceCounters>,
    features: Arc<Mutex<FeatureTable>>,
    retrieved: u64,
    open: bool,
}

impl SimulatedCamera {
    fn new(
        id: CameraId,
        profile: SimulatedProfile,
        counters: Arc<DeviceCounters>,
        features: Arc<Mutex<FeatureTable>>,
    ) -> Self {
        Self {
            id,
            profile,
            slot: Arc::new(LatestFrameSlot::new()),
            producing: Arc::new(AtomicBool::new(false)),
            producer: None,
            counters,
            features,
            retrieved: 0,
            open: true,
        }
    }

    pub fn id(&self) -> &CameraId {
        &self.id
    }

    /// Frames captured but overwritten before retrieval
    pub fn discarded_frames(&self) -> u64 {
        self.slot.discarded()
    }

    fn nodes(&self) -> MutexGuard<'_, FeatureTable> {
        self.features.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn stop_producer(&mut self) {
        self.producing.store(false, Ordering::SeqCst);
        self.slot.close();
        if let Some(handle) = self.producer.take() {
            let _ = handle.join();
        }
    }
}

fn test_pattern(width: u32, height: u32, sequence: u64) -> Bytes {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    let shift = (sequence % 256) as u32;
    for y in 0..height {
        for x in 0..width {
            pixels.push(((x + shift) % 256) as u8);
            pixels.push(((y + shift) % 256) as u8);
            pixels.push(((x ^ y) % 256) as u8);
        }
    }
    Bytes::from(pixels)
}

impl CaptureDevice for SimulatedCamera {
    fn start_acquisition(&mut self) -> Result<(), DeviceError> {
        if !self.open {
            return Err(DeviceError::Closed);
        }
        if self.producer.is_some() {
            return Ok(());
        }

        self.producing.store(true, Ordering::SeqCst);
        if self.profile.stalled {
            return Ok(());
        }

        let slot = Arc::clone(&self.slot);
        let producing = Arc::clone(&self.producing);
        let (width, height) = (self.profile.width, self.profile.height);
        let interval = self.profile.capture_interval;

        let handle = thread::Builder::new()
            .name(format!("sim-camera-{}", self.id))
            .spawn(move || {
                let mut sequence = 0u64;
                while producing.load(Ordering::SeqCst) {
                    sequence += 1;
                    let frame = Frame::rgb8(width, height, test_pattern(width, height, sequence), sequence);
                    if !slot.publish(frame) {
                        break;
                    }
                    thread::sleep(interval);
                }
            })
            .map_err(|e| DeviceError::Acquisition(format!("capture thread: {}", e)))?;

        self.producer = Some(handle);
        Ok(())
    }

    fn is_acquiring(&self) -> bool {
        self.open && self.producing.load(Ordering::SeqCst)
    }

    fn retrieve_frame(&mut self, timeout: Duration) -> Result<Frame, DeviceError> {
        if !self.open {
            return Err(DeviceError::Closed);
        }
        if self.counters.fault.load(Ordering::SeqCst) {
            return Err(DeviceError::Acquisition("device removed".to_string()));
        }
        if let Some(limit) = self.profile.fail_after_frames {
            if self.retrieved >= limit {
                return Err(DeviceError::Acquisition(format!(
                    "transfer failed after {} frames",
                    limit
                )));
            }
        }

        match self.slot.take_timeout(timeout) {
            SlotRecv::Value(frame) => {
                self.retrieved += 1;
                self.counters.retrieved.fetch_add(1, Ordering::SeqCst);
                Ok(frame)
            }
            SlotRecv::Timeout => Err(DeviceError::Timeout(timeout)),
            SlotRecv::Closed => Err(DeviceError::Acquisition("acquisition stopped".to_string())),
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.stop_producer();
        if !self.profile.close_delay.is_zero() {
            thread::sleep(self.profile.close_delay);
        }
        self.open = false;
        self.counters.on_close();
        tracing::debug!(camera = %self.id, "Simulated camera closed");
    }
}

impl FeatureMap for SimulatedCamera {
    fn descriptors(&self) -> Vec<FeatureDescriptor> {
        self.nodes().descriptors()
    }

    fn descriptor(&self, name: &str) -> Option<FeatureDescriptor> {
        self.nodes().descriptor(name)
    }

    fn store(&mut self, name: &str, value: FeatureValue) -> Result<(), FeatureError> {
        if !self.open {
            return Err(DeviceError::Closed.into());
        }
        self.nodes().store(name, value)
    }
}

impl Drop for SimulatedCamera {
    fn drop(&mut self) {
        self.close();
    }
}
