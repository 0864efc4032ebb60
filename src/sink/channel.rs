//! Channel-backed sink
//!
//! [`ChannelSink`] is the sink handed to the registry; [`ViewerReceiver`] is
//! held by the connection task that forwards messages to the viewer. The
//! queue is bounded and `send` never waits: when the viewer falls behind,
//! new frames are dropped for that viewer only.

use std::sync::{Arc, Mutex, OnceLock};

use bytes::Bytes;
use tokio::sync::mpsc;

use super::{CloseCode, FrameSink, SendOutcome};

/// Message received by a viewer connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerMessage {
    /// Encoded frame envelope
    Frame(Bytes),
    /// The server closed the stream with this code
    Closed(CloseCode),
}

/// Bounded, drop-if-full sink
pub struct ChannelSink {
    tx: Mutex<Option<mpsc::Sender<Bytes>>>,
    close_code: Arc<OnceLock<CloseCode>>,
}

impl ChannelSink {
    /// Create a sink and its receiving half with room for `capacity` frames
    pub fn channel(capacity: usize) -> (Arc<ChannelSink>, ViewerReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let close_code = Arc::new(OnceLock::new());

        let sink = Arc::new(ChannelSink {
            tx: Mutex::new(Some(tx)),
            close_code: Arc::clone(&close_code),
        });
        let receiver = ViewerReceiver {
            rx,
            close_code,
            close_reported: false,
        };

        (sink, receiver)
    }

    /// Close code, if the sink was closed by the server
    pub fn close_code(&self) -> Option<CloseCode> {
        self.close_code.get().copied()
    }
}

impl FrameSink for ChannelSink {
    fn send(&self, message: Bytes) -> SendOutcome {
        let tx = self.tx.lock().unwrap_or_else(|p| p.into_inner());
        let Some(tx) = tx.as_ref() else {
            return SendOutcome::Closed;
        };

        match tx.try_send(message) {
            Ok(()) => SendOutcome::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => SendOutcome::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }

    fn close(&self, code: CloseCode) {
        let _ = self.close_code.set(code);
        // Dropping the sender lets the receiver drain what is queued, then
        // observe the close.
        self.tx.lock().unwrap_or_else(|p| p.into_inner()).take();
    }
}

/// Receiving half of a [`ChannelSink`]
pub struct ViewerReceiver {
    rx: mpsc::Receiver<Bytes>,
    close_code: Arc<OnceLock<CloseCode>>,
    close_reported: bool,
}

impl ViewerReceiver {
    /// Next message for the viewer
    ///
    /// Yields queued frames first, then `Closed(code)` once if the server
    /// closed the sink, then `None`.
    pub async fn recv(&mut self) -> Option<ViewerMessage> {
        if let Some(frame) = self.rx.recv().await {
            return Some(ViewerMessage::Frame(frame));
        }
        self.take_close()
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<ViewerMessage> {
        match self.rx.try_recv() {
            Ok(frame) => Some(ViewerMessage::Frame(frame)),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => self.take_close(),
        }
    }

    fn take_close(&mut self) -> Option<ViewerMessage> {
        if self.close_reported {
            return None;
        }
        self.close_reported = true;
        self.close_code.get().copied().map(ViewerMessage::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_and_receive() {
        let (sink, mut rx) = ChannelSink::channel(4);

        assert_eq!(sink.send(Bytes::from_static(b"a")), SendOutcome::Delivered);
        assert_eq!(sink.send(Bytes::from_static(b"b")), SendOutcome::Delivered);

        assert_eq!(rx.recv().await, Some(ViewerMessage::Frame(Bytes::from_static(b"a"))));
        assert_eq!(rx.recv().await, Some(ViewerMessage::Frame(Bytes::from_static(b"b"))));
        assert_eq!(rx.try_recv(), None);
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let (sink, mut rx) = ChannelSink::channel(1);

        assert_eq!(sink.send(Bytes::from_static(b"1")), SendOutcome::Delivered);
        assert_eq!(sink.send(Bytes::from_static(b"2")), SendOutcome::Dropped);

        assert_eq!(rx.recv().await, Some(ViewerMessage::Frame(Bytes::from_static(b"1"))));
        assert_eq!(sink.send(Bytes::from_static(b"3")), SendOutcome::Delivered);
    }

    #[tokio::test]
    async fn test_close_drains_then_reports_code_once() {
        let (sink, mut rx) = ChannelSink::channel(4);
        sink.send(Bytes::from_static(b"last"));
        sink.close(CloseCode::STREAM_ERROR);
        sink.close(CloseCode::NORMAL);

        assert_eq!(sink.send(Bytes::from_static(b"late")), SendOutcome::Closed);
        assert_eq!(sink.close_code(), Some(CloseCode::STREAM_ERROR));

        assert_eq!(rx.recv().await, Some(ViewerMessage::Frame(Bytes::from_static(b"last"))));
        assert_eq!(rx.recv().await, Some(ViewerMessage::Closed(CloseCode::STREAM_ERROR)));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_recv_pending_until_frame() {
        let (sink, mut rx) = ChannelSink::channel(2);
        let mut recv = tokio_test::task::spawn(rx.recv());

        tokio_test::assert_pending!(recv.poll());
        sink.send(Bytes::from_static(b"f"));
        assert!(recv.is_woken());
        assert_eq!(
            tokio_test::assert_ready!(recv.poll()),
            Some(ViewerMessage::Frame(Bytes::from_static(b"f")))
        );
    }

    #[test]
    fn test_send_after_viewer_gone() {
        let (sink, rx) = ChannelSink::channel(4);
        drop(rx);
        assert_eq!(sink.send(Bytes::from_static(b"x")), SendOutcome::Closed);
    }
}
