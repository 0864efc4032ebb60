//! Viewer sinks
//!
//! A sink is whatever pushes encoded frames to one viewer (typically a
//! websocket connection). The session only needs two capabilities from it:
//! accept a message without blocking, and be closed with a reason code.
//!
//! Sinks are shared as [`SinkHandle`]s. Membership in a session is by
//! handle identity, so the same viewer attaching or detaching twice is
//! harmless.

pub mod channel;
pub mod envelope;

#[cfg(test)]
pub(crate) mod recording;

use std::sync::Arc;

use bytes::Bytes;

pub use channel::{ChannelSink, ViewerMessage, ViewerReceiver};
pub use envelope::FrameEnvelope;

/// Reason code sent when a sink is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// Normal closure
    pub const NORMAL: CloseCode = CloseCode(1000);
    /// Stream terminated by the server because of an upstream failure
    pub const STREAM_ERROR: CloseCode = CloseCode(4000);

    pub fn code(&self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of offering a message to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Accepted for delivery
    Delivered,
    /// Sink was busy; this message was dropped for it
    Dropped,
    /// Sink is closed and will never accept again
    Closed,
}

/// Outbound channel to one viewer
///
/// `send` is called from a session's acquisition worker while the sink set
/// is locked, so it must return promptly: queue or drop, never wait.
pub trait FrameSink: Send + Sync {
    /// Offer an encoded envelope
    fn send(&self, message: Bytes) -> SendOutcome;

    /// Close the sink with a reason code. Must be idempotent.
    fn close(&self, code: CloseCode);
}

/// Shared reference to a sink
pub type SinkHandle = Arc<dyn FrameSink>;

/// Whether two handles refer to the same sink
pub fn same_sink(a: &SinkHandle, b: &SinkHandle) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
