//! Stream sessions
//!
//! A [`StreamSession`] owns the acquisition worker for exactly one camera and
//! the set of sinks that currently watch it. Every captured frame is encoded
//! once and offered to all sinks.
//!
//! ```text
//!   StreamRegistry ── add_sink / remove_sink / stop ──┐
//!                                                     ▼
//!                                   StreamSession { running, phase, sinks }
//!                                                     │ spawn_blocking
//!                                                     ▼
//!              open ─► start_acquisition ─► [retrieve ─► encode ─► broadcast ─► pace]*
//!                                                     │
//!                                                     ▼
//!                       seal sinks ─► close device ─► close drained sinks
//! ```

mod acquisition;
mod sinks;
pub mod state;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::device::{CameraId, DeviceOpener};
use crate::encode::FrameEncoder;
use crate::registry::RegistryConfig;
use crate::sink::{CloseCode, SinkHandle};
use crate::stats::{SessionCounters, SessionStats};

use acquisition::Acquisition;
use sinks::SinkSet;
use state::PhaseCell;

pub use state::SessionPhase;

/// Acquisition loop and sink set for one camera
pub struct StreamSession {
    id: CameraId,
    running: Arc<AtomicBool>,
    phase: Arc<PhaseCell>,
    sinks: Arc<SinkSet>,
    counters: Arc<SessionCounters>,
    worker: Option<JoinHandle<()>>,
}

impl StreamSession {
    /// Create a session in the `Created` phase
    pub fn new(id: CameraId) -> Self {
        Self {
            id,
            running: Arc::new(AtomicBool::new(false)),
            phase: Arc::new(PhaseCell::new()),
            sinks: Arc::new(SinkSet::new()),
            counters: Arc::new(SessionCounters::new()),
            worker: None,
        }
    }

    /// Camera this session streams
    pub fn id(&self) -> &CameraId {
        &self.id
    }

    /// Spawn the acquisition worker
    ///
    /// Must be called from within a tokio runtime. Calling it twice is a no-op.
    pub fn start<O: DeviceOpener>(&mut self, opener: Arc<O>, config: &RegistryConfig) {
        if self.worker.is_some() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);

        let acquisition = Acquisition {
            id: self.id.clone(),
            opener,
            running: Arc::clone(&self.running),
            phase: Arc::clone(&self.phase),
            sinks: Arc::clone(&self.sinks),
            counters: Arc::clone(&self.counters),
            encoder: FrameEncoder::new(config.jpeg_quality),
            retrieve_timeout: config.retrieve_timeout,
            frame_interval: config.frame_interval,
            fatal_close_code: config.fatal_close_code,
        };

        self.worker = Some(tokio::task::spawn_blocking(move || acquisition.run()));
        tracing::info!(camera = %self.id, "Stream session started");
    }

    /// Attach a sink, returning the new sink count
    ///
    /// Fails, handing the sink back, once the session has torn itself down
    /// after a fatal error.
    pub fn add_sink(&self, sink: SinkHandle) -> Result<usize, SinkHandle> {
        let count = self.sinks.add(sink)?;
        tracing::info!(camera = %self.id, sinks = count, "Viewer joined");
        Ok(count)
    }

    /// Detach a sink; `None` if it was not attached
    pub fn remove_sink(&self, sink: &SinkHandle) -> Option<usize> {
        let count = self.sinks.remove(sink)?;
        tracing::info!(camera = %self.id, sinks = count, "Viewer left");
        Some(count)
    }

    /// Current number of attached sinks
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Close all attached sinks with `code` without stopping the worker
    pub fn close_sinks(&self, code: CloseCode) -> usize {
        self.sinks.close_all(code)
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        self.phase.get()
    }

    /// Whether the session can still serve viewers
    ///
    /// False once a stop was requested or the worker ended on its own.
    pub fn is_alive(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.sinks.is_sealed()
    }

    /// Statistics snapshot
    pub fn stats(&self) -> SessionStats {
        self.counters.snapshot(self.sinks.len())
    }

    /// Stop the worker and wait until it has exited and closed the device
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        let Some(worker) = self.worker.take() else {
            self.phase.advance(SessionPhase::Stopped);
            return;
        };
        self.phase.advance(SessionPhase::Stopping);

        if let Err(e) = worker.await {
            tracing::error!(camera = %self.id, error = %e, "Stream worker panicked");
            self.phase.advance(SessionPhase::Stopped);
        }
        tracing::info!(camera = %self.id, "Stream session stopped");
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        // A dropped session must not leave its worker streaming
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::device::{SimulatedOpener, SimulatedProfile};
    use crate::sink::recording::RecordingSink;
    use crate::sink::FrameEnvelope;

    fn fast_config() -> RegistryConfig {
        RegistryConfig::default()
            .retrieve_timeout(Duration::from_millis(100))
            .frame_interval(Duration::from_millis(5))
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..400 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_session_lifecycle() {
        let opener = Arc::new(SimulatedOpener::new());
        let id = CameraId::new("CAM1");
        let sink = Arc::new(RecordingSink::new());

        let mut session = StreamSession::new(id.clone());
        assert_eq!(session.phase(), SessionPhase::Created);
        assert_eq!(session.add_sink(sink.clone()).ok(), Some(1));

        session.start(Arc::clone(&opener), &fast_config());
        wait_until(|| sink.message_count() >= 3).await;
        assert_eq!(session.phase(), SessionPhase::Running);
        assert!(session.is_alive());

        let handle: SinkHandle = sink.clone();
        assert_eq!(session.remove_sink(&handle), Some(0));
        session.stop().await;

        assert_eq!(session.phase(), SessionPhase::Stopped);
        assert!(!session.is_alive());
        let counters = opener.counters(&id);
        assert_eq!(counters.opens(), 1);
        assert_eq!(counters.closes(), 1);
        assert!(!sink.is_closed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_broadcast_same_payload_to_all_sinks() {
        let opener = Arc::new(SimulatedOpener::new());
        let sinks: Vec<Arc<RecordingSink>> = (0..3).map(|_| Arc::new(RecordingSink::new())).collect();

        let mut session = StreamSession::new(CameraId::new("CAM1"));
        for sink in &sinks {
            session.add_sink(sink.clone()).ok();
        }
        session.start(opener, &fast_config());

        wait_until(|| sinks.iter().all(|s| s.message_count() >= 1)).await;
        let first = sinks[0].messages()[0].clone();
        assert!(sinks.iter().all(|s| s.messages()[0] == first));
        assert!(FrameEnvelope::from_slice(&first).unwrap().jpeg().is_some());

        // Removing B stops delivery to B but not to A and C
        let b: SinkHandle = sinks[1].clone();
        session.remove_sink(&b);
        let b_count = sinks[1].message_count();
        let a_count = sinks[0].message_count();
        wait_until(|| sinks[0].message_count() > a_count + 2 && sinks[2].message_count() > a_count + 2).await;
        assert_eq!(sinks[1].message_count(), b_count);

        session.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_open_failure_closes_sinks_with_fatal_code() {
        let opener = Arc::new(SimulatedOpener::with_default_profile(
            SimulatedProfile::default().fail_open(),
        ));
        let sink = Arc::new(RecordingSink::new());

        let mut session = StreamSession::new(CameraId::new("MISSING"));
        session.add_sink(sink.clone()).ok();
        session.start(opener, &fast_config());

        wait_until(|| sink.is_closed()).await;
        assert_eq!(sink.close_codes(), vec![CloseCode::STREAM_ERROR]);
        assert!(!session.is_alive());

        let late: SinkHandle = Arc::new(RecordingSink::new());
        assert!(session.add_sink(late).is_err());

        session.stop().await;
        assert_eq!(session.phase(), SessionPhase::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timeouts_are_not_fatal() {
        let opener = Arc::new(SimulatedOpener::with_default_profile(
            SimulatedProfile::default().stalled(),
        ));
        let sink = Arc::new(RecordingSink::new());
        let config = fast_config().retrieve_timeout(Duration::from_millis(10));

        let mut session = StreamSession::new(CameraId::new("CAM1"));
        session.add_sink(sink.clone()).ok();
        session.start(opener, &config);

        wait_until(|| session.stats().timeouts >= 3).await;
        assert!(session.is_alive());
        assert!(!sink.is_closed());

        session.stop().await;
        assert_eq!(session.stats().frames_captured, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pacing_bounds_delivery_rate() {
        // Camera captures every millisecond; pacing allows one frame per 50 ms
        let opener = Arc::new(SimulatedOpener::with_default_profile(
            SimulatedProfile::default().capture_interval(Duration::from_millis(1)),
        ));
        let sink = Arc::new(RecordingSink::new());
        let config = fast_config().frame_interval(Duration::from_millis(50));

        let mut session = StreamSession::new(CameraId::new("CAM1"));
        session.add_sink(sink.clone()).ok();
        let started = std::time::Instant::now();
        session.start(opener, &config);

        tokio::time::sleep(Duration::from_millis(500)).await;
        session.stop().await;
        let elapsed = started.elapsed();

        let bound = (elapsed.as_millis() / 50) as usize + 1;
        assert!(sink.message_count() >= 1);
        assert!(sink.message_count() <= bound);
    }
}
