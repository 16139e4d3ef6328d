//! Event normalizer: raw device messages to trigger events.
//!
//! Filtering rules, in order:
//! 1. Timing/keepalive messages (clock, active sensing, MTC quarter frame)
//!    are dropped unconditionally.
//! 2. Only note-class messages (note-on, note-off) qualify, and only when
//!    their velocity equals the release sentinel.
//!
//! The sentinel rule is device-specific: the controllers this was tuned
//! against report key release as a note message with velocity 0, and firing
//! only on that edge avoids acting on both press and release. Controllers that
//! signal the qualifying edge with a different velocity never trigger unless
//! the sentinel is configured to match.
use std::time::Duration;

use crate::{RawMessage, TriggerEvent, TriggerIdentity};

/// Velocity the default normalizer treats as "key released".
pub const DEFAULT_RELEASE_VELOCITY: u8 = 0;

/// Pure filter from raw messages to trigger events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Normalizer {
    /// Velocity that qualifies a note message.
    release_velocity: u8,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_RELEASE_VELOCITY)
    }
}

impl Normalizer {
    /// Create a normalizer with a specific release sentinel.
    pub fn new(release_velocity: u8) -> Self {
        Self { release_velocity }
    }

    /// The configured sentinel.
    pub fn release_velocity(&self) -> u8 {
        self.release_velocity
    }

    /// Normalize `msg` received at `timestamp`; `None` when filtered.
    pub fn normalize(&self, msg: &RawMessage, timestamp: Duration) -> Option<TriggerEvent> {
        if msg.kind.is_timing() || !msg.kind.is_note() {
            return None;
        }
        let velocity = msg.velocity()?;
        if velocity != self.release_velocity {
            return None;
        }
        let identity = TriggerIdentity::of(msg)?;
        Some(TriggerEvent::new(identity, velocity, timestamp))
    }
}
