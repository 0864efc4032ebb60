//! Sink set shared by a session handle and its acquisition worker
//!
//! Membership changes and broadcast iteration take the same lock, so a
//! broadcast always sees a consistent snapshot and the count read by the
//! registry is exact. Once the worker tears down, the set is sealed: it
//! refuses new members so a late attach can move to a fresh session instead
//! of joining a dead one.

use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;

use crate::sink::{same_sink, CloseCode, SendOutcome, SinkHandle};

/// Per-pass broadcast tally
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BroadcastTally {
    pub(crate) delivered: u64,
    pub(crate) dropped: u64,
    pub(crate) closed: u64,
}

#[derive(Default)]
struct Members {
    sinks: Vec<SinkHandle>,
    sealed: bool,
}

#[derive(Default)]
pub(crate) struct SinkSet {
    members: Mutex<Members>,
}

impl SinkSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Members> {
        self.members.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Add a sink, returning the new member count
    ///
    /// A sealed set hands the sink back. Adding a sink that is already a
    /// member leaves the set unchanged.
    pub(crate) fn add(&self, sink: SinkHandle) -> Result<usize, SinkHandle> {
        let mut members = self.lock();
        if members.sealed {
            return Err(sink);
        }
        if !members.sinks.iter().any(|s| same_sink(s, &sink)) {
            members.sinks.push(sink);
        }
        Ok(members.sinks.len())
    }

    /// Remove a sink; `None` if it was not a member
    pub(crate) fn remove(&self, sink: &SinkHandle) -> Option<usize> {
        let mut members = self.lock();
        let index = members.sinks.iter().position(|s| same_sink(s, sink))?;
        members.sinks.swap_remove(index);
        Some(members.sinks.len())
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().sinks.len()
    }

    pub(crate) fn is_sealed(&self) -> bool {
        self.lock().sealed
    }

    /// Offer one message to every member
    pub(crate) fn broadcast(&self, message: &Bytes) -> BroadcastTally {
        let members = self.lock();
        let mut tally = BroadcastTally::default();

        for sink in members.sinks.iter() {
            match sink.send(message.clone()) {
                SendOutcome::Delivered => tally.delivered += 1,
                SendOutcome::Dropped => tally.dropped += 1,
                SendOutcome::Closed => tally.closed += 1,
            }
        }

        tally
    }

    /// Seal the set and hand back its members
    ///
    /// Later adds are refused. The caller closes the returned sinks once the
    /// device is released.
    pub(crate) fn seal(&self) -> Vec<SinkHandle> {
        let mut members = self.lock();
        members.sealed = true;
        std::mem::take(&mut members.sinks)
    }

    /// Close every member with `code` without sealing
    pub(crate) fn close_all(&self, code: CloseCode) -> usize {
        let drained = std::mem::take(&mut self.lock().sinks);
        for sink in drained.iter() {
            sink.close(code);
        }
        drained.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sink::recording::RecordingSink;
    use crate::sink::FrameSink;

    #[test]
    fn test_add_remove() {
        let set = SinkSet::new();
        let a: SinkHandle = Arc::new(RecordingSink::new());
        let b: SinkHandle = Arc::new(RecordingSink::new());

        assert_eq!(set.add(Arc::clone(&a)).ok(), Some(1));
        assert_eq!(set.add(Arc::clone(&b)).ok(), Some(2));
        assert_eq!(set.add(Arc::clone(&a)).ok(), Some(2));

        assert_eq!(set.remove(&a), Some(1));
        assert_eq!(set.remove(&a), None);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_broadcast_tally() {
        let set = SinkSet::new();
        let ok = Arc::new(RecordingSink::new());
        let busy = Arc::new(RecordingSink::busy());
        let gone = Arc::new(RecordingSink::new());
        gone.close(CloseCode::NORMAL);

        set.add(ok.clone()).ok();
        set.add(busy.clone()).ok();
        set.add(gone.clone()).ok();

        let tally = set.broadcast(&Bytes::from_static(b"frame"));
        assert_eq!(
            tally,
            BroadcastTally {
                delivered: 1,
                dropped: 1,
                closed: 1
            }
        );
        assert_eq!(ok.messages(), vec![Bytes::from_static(b"frame")]);
    }

    #[test]
    fn test_sealed_set_refuses_members() {
        let set = SinkSet::new();
        let a = Arc::new(RecordingSink::new());
        set.add(a.clone()).ok();

        let drained = set.seal();
        assert_eq!(drained.len(), 1);
        assert!(set.is_sealed());
        assert!(!a.is_closed());
        assert_eq!(set.len(), 0);

        let late: SinkHandle = Arc::new(RecordingSink::new());
        assert!(set.add(late).is_err());
    }
}
