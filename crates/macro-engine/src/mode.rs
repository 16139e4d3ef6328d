use std::sync::atomic::{AtomicBool, Ordering};

use macro_protocol::{ConnectionStatus, Mode};
use parking_lot::RwLock;

/// Shared holder of the execution mode and connection status.
///
/// Read by the dispatch loop on every event, written rarely by the control
/// surface and the listener. Neither value can be observed half-written.
#[derive(Default)]
pub struct ModeGate {
    /// True when mode is Live.
    live: AtomicBool,
    /// Current connection status.
    status: RwLock<ConnectionStatus>,
}

impl ModeGate {
    /// Gate starting in `mode`, disconnected.
    pub fn new(mode: Mode) -> Self {
        Self {
            live: AtomicBool::new(mode == Mode::Live),
            status: RwLock::new(ConnectionStatus::Disconnected),
        }
    }

    /// Current mode.
    pub fn get_mode(&self) -> Mode {
        if self.live.load(Ordering::Acquire) {
            Mode::Live
        } else {
            Mode::Test
        }
    }

    /// Set the mode, returning true when it changed.
    pub fn set_mode(&self, mode: Mode) -> bool {
        let was = self.live.swap(mode == Mode::Live, Ordering::AcqRel);
        was != (mode == Mode::Live)
    }

    /// Current connection status.
    pub fn get_status(&self) -> ConnectionStatus {
        self.status.read().clone()
    }

    /// Set the connection status, returning true when it changed.
    pub fn set_status(&self, status: ConnectionStatus) -> bool {
        let mut cur = self.status.write();
        if *cur == status {
            return false;
        }
        *cur = status;
        true
    }
}
