//! Acquisition worker
//!
//! Runs on a dedicated blocking thread for the whole life of a session:
//! open the camera, grab latest-only frames, encode each one once, broadcast
//! it to the sink set, pace, repeat. The running flag is checked at the top
//! of every iteration and again after each broadcast, so a stop request
//! takes effect within one retrieve-timeout plus one encode/broadcast.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::device::{CameraId, CaptureDevice, DeviceOpener};
use crate::encode::FrameEncoder;
use crate::error::DeviceError;
use crate::sink::{CloseCode, FrameSink, SinkHandle};
use crate::stats::SessionCounters;

use super::sinks::SinkSet;
use super::state::{PhaseCell, SessionPhase};

/// Why the worker stopped streaming
#[derive(Debug)]
enum Exit {
    /// The registry cleared the running flag
    Requested,
    /// The device failed or stopped acquiring on its own
    Failed(DeviceError),
}

/// Everything the worker needs, moved onto its thread
pub(crate) struct Acquisition<O: DeviceOpener> {
    pub(crate) id: CameraId,
    pub(crate) opener: Arc<O>,
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) phase: Arc<PhaseCell>,
    pub(crate) sinks: Arc<SinkSet>,
    pub(crate) counters: Arc<SessionCounters>,
    pub(crate) encoder: FrameEncoder,
    pub(crate) retrieve_timeout: Duration,
    pub(crate) frame_interval: Duration,
    pub(crate) fatal_close_code: CloseCode,
}

impl<O: DeviceOpener> Acquisition<O> {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Worker entry point
    pub(crate) fn run(self) {
        self.phase.advance(SessionPhase::Running);
        tracing::info!(camera = %self.id, "Stream worker started");

        let (exit, device) = if self.is_running() {
            match self.opener.open(&self.id) {
                Ok(mut device) => {
                    let exit = self.stream(&mut device);
                    (exit, Some(device))
                }
                Err(e) => (Exit::Failed(e), None),
            }
        } else {
            (Exit::Requested, None)
        };

        // Refuse new sinks before the device is released so a late attach
        // moves to a fresh session instead of joining this one
        self.running.store(false, Ordering::SeqCst);
        self.phase.advance(SessionPhase::Stopping);
        let drained = self.sinks.seal();

        if let Some(mut device) = device {
            device.close();
            tracing::info!(camera = %self.id, "Camera connection closed");
        }

        self.teardown(exit, drained);
        self.phase.advance(SessionPhase::Stopped);

        tracing::info!(camera = %self.id, "Stream worker stopped");
    }

    fn stream<D: CaptureDevice>(&self, device: &mut D) -> Exit {
        if let Err(e) = device.start_acquisition() {
            return Exit::Failed(e);
        }

        while self.is_running() && device.is_acquiring() {
            let frame = match device.retrieve_frame(self.retrieve_timeout) {
                Ok(frame) => frame,
                Err(e) if e.is_transient() => {
                    self.counters.timeout();
                    tracing::warn!(camera = %self.id, error = %e, "Frame grab timeout");
                    continue;
                }
                Err(e) => return Exit::Failed(e),
            };
            self.counters.frame_captured();

            let encoded = self.encoder.encode(&frame);
            let sequence = frame.sequence;
            drop(frame);

            match encoded {
                Ok(message) => {
                    let tally = self.sinks.broadcast(&message);
                    self.counters.frame_broadcast(tally.delivered, tally.dropped);

                    if tally.dropped > 0 {
                        tracing::debug!(
                            camera = %self.id,
                            sequence = sequence,
                            dropped = tally.dropped,
                            "Busy sinks skipped frame"
                        );
                    }
                }
                Err(e) => {
                    self.counters.encode_failure();
                    tracing::warn!(camera = %self.id, sequence = sequence, error = %e, "Frame encode failed");
                }
            }

            if !self.is_running() {
                break;
            }
            std::thread::sleep(self.frame_interval);
        }

        if self.is_running() {
            Exit::Failed(DeviceError::Acquisition("device stopped acquiring".to_string()))
        } else {
            Exit::Requested
        }
    }

    fn teardown(&self, exit: Exit, drained: Vec<SinkHandle>) {
        let code = match &exit {
            Exit::Requested => CloseCode::NORMAL,
            Exit::Failed(e) => {
                tracing::error!(camera = %self.id, error = %e, "Fatal stream error");
                self.fatal_close_code
            }
        };

        for sink in drained.iter() {
            sink.close(code);
        }
        if !drained.is_empty() {
            tracing::info!(
                camera = %self.id,
                sinks = drained.len(),
                code = code.code(),
                "Closed remaining sinks"
            );
        }
    }
}
