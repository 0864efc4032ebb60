//! Test sink that records everything it receives

use std::sync::Mutex;

use bytes::Bytes;

use super::{CloseCode, FrameSink, SendOutcome};

#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    messages: Mutex<Vec<Bytes>>,
    close_codes: Mutex<Vec<CloseCode>>,
    busy: std::sync::atomic::AtomicBool,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sink that drops everything as if its queue were full
    pub(crate) fn busy() -> Self {
        let sink = Self::default();
        sink.busy.store(true, std::sync::atomic::Ordering::SeqCst);
        sink
    }

    pub(crate) fn messages(&self) -> Vec<Bytes> {
        self.messages.lock().unwrap().clone()
    }

    pub(crate) fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub(crate) fn close_codes(&self) -> Vec<CloseCode> {
        self.close_codes.lock().unwrap().clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        !self.close_codes.lock().unwrap().is_empty()
    }
}

impl FrameSink for RecordingSink {
    fn send(&self, message: Bytes) -> SendOutcome {
        if self.is_closed() {
            return SendOutcome::Closed;
        }
        if self.busy.load(std::sync::atomic::Ordering::SeqCst) {
            return SendOutcome::Dropped;
        }
        self.messages.lock().unwrap().push(message);
        SendOutcome::Delivered
    }

    fn close(&self, code: CloseCode) {
        self.close_codes.lock().unwrap().push(code);
    }
}
