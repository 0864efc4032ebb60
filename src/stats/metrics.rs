//! Statistics for stream sessions

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters updated by a session's acquisition worker
#[derive(Debug)]
pub(crate) struct SessionCounters {
    started_at: Instant,
    frames_captured: AtomicU64,
    frames_broadcast: AtomicU64,
    deliveries: AtomicU64,
    drops: AtomicU64,
    timeouts: AtomicU64,
    encode_failures: AtomicU64,
}

impl SessionCounters {
    pub(crate) fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_captured: AtomicU64::new(0),
            frames_broadcast: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            drops: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            encode_failures: AtomicU64::new(0),
        }
    }

    pub(crate) fn frame_captured(&self) {
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_broadcast(&self, delivered: u64, dropped: u64) {
        self.frames_broadcast.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered, Ordering::Relaxed);
        self.drops.fetch_add(dropped, Ordering::Relaxed);
    }

    pub(crate) fn timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn encode_failure(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, sink_count: usize) -> SessionStats {
        SessionStats {
            sink_count,
            uptime: self.started_at.elapsed(),
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_broadcast: self.frames_broadcast.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time statistics for one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    /// Attached sinks
    pub sink_count: usize,
    /// Time since the session started
    pub uptime: Duration,
    /// Frames retrieved from the device
    pub frames_captured: u64,
    /// Frames encoded and offered to the sink set
    pub frames_broadcast: u64,
    /// Envelopes accepted by sinks
    pub deliveries: u64,
    /// Envelopes dropped by busy sinks
    pub drops: u64,
    /// Retrieve calls that timed out
    pub timeouts: u64,
    /// Frames skipped because encoding failed
    pub encode_failures: u64,
}

impl SessionStats {
    /// Broadcast rate over the session's lifetime
    pub fn broadcast_fps(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.frames_broadcast as f64 / secs
        } else {
            0.0
        }
    }
}
