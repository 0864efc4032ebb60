//! Session state machine
//!
//! Tracks a stream session from construction to the moment its acquisition
//! worker has exited and the device is closed.

use std::sync::atomic::{AtomicU8, Ordering};

/// Session lifecycle phase
///
/// Phases only move forward: `Created → Running → Stopping → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionPhase {
    /// Constructed, worker not yet running
    Created,
    /// Worker is opening the device or streaming
    Running,
    /// Stop requested or fatal error observed; worker is winding down
    Stopping,
    /// Device closed and worker exited
    Stopped,
}

impl SessionPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionPhase::Created,
            1 => SessionPhase::Running,
            2 => SessionPhase::Stopping,
            _ => SessionPhase::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SessionPhase::Created => 0,
            SessionPhase::Running => 1,
            SessionPhase::Stopping => 2,
            SessionPhase::Stopped => 3,
        }
    }
}

/// Phase shared between a session handle and its worker
#[derive(Debug)]
pub(crate) struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(SessionPhase::Created.as_u8()))
    }

    pub(crate) fn get(&self) -> SessionPhase {
        SessionPhase::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Move to `phase` unless the session is already past it
    pub(crate) fn advance(&self, phase: SessionPhase) {
        self.0.fetch_max(phase.as_u8(), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_lifecycle() {
        let phase = PhaseCell::new();
        assert_eq!(phase.get(), SessionPhase::Created);

        phase.advance(SessionPhase::Running);
        assert_eq!(phase.get(), SessionPhase::Running);

        phase.advance(SessionPhase::Stopping);
        phase.advance(SessionPhase::Stopped);
        assert_eq!(phase.get(), SessionPhase::Stopped);
    }

    #[test]
    fn test_phase_never_moves_backwards() {
        let phase = PhaseCell::new();
        phase.advance(SessionPhase::Stopping);
        phase.advance(SessionPhase::Running);

        assert_eq!(phase.get(), SessionPhase::Stopping);
    }
}
