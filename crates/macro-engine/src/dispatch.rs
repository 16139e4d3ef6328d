//! Per-identity debounce decision.
//!
//! Each bound identity is either idle or cooling down after an accepted
//! fire. An event inside the window is suppressed; execution is debounced,
//! the trigger-fired notification is not. Unbound identities never enter
//! the table.
use std::{collections::HashMap, time::Duration};

use macro_protocol::{Mode, Outcome};
use macro_registry::{Macro, Registry};
use midi_input::{TriggerEvent, TriggerIdentity};
use tracing::trace;

use crate::ModeGate;

/// What to do with one trigger event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No macro is bound to the identity.
    Unbound,
    /// Bound, but inside the debounce window.
    Suppressed(Macro),
    /// Bound and accepted in test mode; do not execute.
    Skipped(Macro),
    /// Bound and accepted in live mode; execute exactly once.
    Execute(Macro),
}

impl Decision {
    /// True when a macro is bound.
    pub fn is_bound(&self) -> bool {
        !matches!(self, Self::Unbound)
    }

    /// Outcome known at decision time; `None` for unbound events and for
    /// executions still to run.
    pub fn immediate_outcome(&self) -> Option<Outcome> {
        match self {
            Self::Suppressed(_) => Some(Outcome::Suppressed),
            Self::Skipped(_) => Some(Outcome::SkippedTestMode),
            Self::Unbound | Self::Execute(_) => None,
        }
    }

    /// Short name used in logs and the audit trail.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unbound => "unbound",
            Self::Suppressed(_) => "suppressed",
            Self::Skipped(_) => "skipped_test_mode",
            Self::Execute(_) => "execute",
        }
    }
}

/// Debounce state for every identity that has fired.
pub struct Dispatcher {
    /// Minimum interval between accepted fires of one identity.
    window: Duration,
    /// Timestamp of the last accepted fire per identity.
    last_fired: HashMap<TriggerIdentity, Duration>,
}

impl Dispatcher {
    /// Dispatcher with the given debounce window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: HashMap::new(),
        }
    }

    /// The debounce window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Timestamp of the last accepted fire of `identity`, if cooling down
    /// or previously fired.
    pub fn last_fired(&self, identity: &TriggerIdentity) -> Option<Duration> {
        self.last_fired.get(identity).copied()
    }

    /// Number of identities with dispatch state.
    pub fn tracked(&self) -> usize {
        self.last_fired.len()
    }

    /// Drop the state of `identity`.
    pub fn forget(&mut self, identity: &TriggerIdentity) {
        self.last_fired.remove(identity);
    }

    /// Decide what to do with `event`.
    ///
    /// The last-fired timestamp is updated before the mode is read, so an
    /// accepted event closes the window before anything executes. Events
    /// timestamped earlier than the last accepted fire are suppressed.
    pub fn decide(&mut self, event: &TriggerEvent, registry: &Registry, gate: &ModeGate) -> Decision {
        let Some(m) = registry.lookup(&event.identity) else {
            return Decision::Unbound;
        };
        if let Some(last) = self.last_fired.get(&event.identity)
            && event.timestamp.saturating_sub(*last) < self.window
        {
            trace!(identity = %event.identity, "debounce_suppressed");
            return Decision::Suppressed(m);
        }
        self.last_fired.insert(event.identity, event.timestamp);
        match gate.get_mode() {
            Mode::Live => Decision::Execute(m),
            Mode::Test => Decision::Skipped(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use macro_registry::Action;

    use super::*;

    fn id(n: u8) -> TriggerIdentity {
        TriggerIdentity::note_on(0, n)
    }

    fn at(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    fn fixture(mode: Mode) -> (Dispatcher, Registry, ModeGate) {
        let reg = Registry::new();
        reg.upsert(id(60), "Pad", Action::write_text("hi").unwrap())
            .unwrap();
        (Dispatcher::new(at(500)), reg, ModeGate::new(mode))
    }

    fn executions(d: &mut Dispatcher, reg: &Registry, gate: &ModeGate, times: &[u64]) -> usize {
        times
            .iter()
            .map(|t| d.decide(&TriggerEvent::new(id(60), 0, at(*t)), reg, gate))
            .filter(|dec| matches!(dec, Decision::Execute(_)))
            .count()
    }

    #[test]
    fn fires_inside_window_are_suppressed() {
        let (mut d, reg, gate) = fixture(Mode::Live);
        assert_eq!(executions(&mut d, &reg, &gate, &[0, 300]), 1);
    }

    #[test]
    fn fires_outside_window_both_execute() {
        let (mut d, reg, gate) = fixture(Mode::Live);
        assert_eq!(executions(&mut d, &reg, &gate, &[0, 600]), 2);
    }

    #[test]
    fn window_boundary_is_accepted() {
        let (mut d, reg, gate) = fixture(Mode::Live);
        assert_eq!(executions(&mut d, &reg, &gate, &[0, 499, 500]), 2);
    }

    #[test]
    fn suppression_does_not_extend_window() {
        let (mut d, reg, gate) = fixture(Mode::Live);
        assert_eq!(executions(&mut d, &reg, &gate, &[0, 400, 550]), 2);
        assert_eq!(d.last_fired(&id(60)), Some(at(550)));
    }

    #[test]
    fn test_mode_never_executes() {
        let (mut d, reg, gate) = fixture(Mode::Test);
        let e = TriggerEvent::new(id(60), 0, at(0));
        assert!(matches!(d.decide(&e, &reg, &gate), Decision::Skipped(_)));
        assert_eq!(executions(&mut d, &reg, &gate, &[1000, 2000]), 0);
    }

    #[test]
    fn unknown_identity_leaves_no_state() {
        let (mut d, reg, gate) = fixture(Mode::Live);
        let e = TriggerEvent::new(id(1), 0, at(0));
        assert_eq!(d.decide(&e, &reg, &gate), Decision::Unbound);
        assert_eq!(d.tracked(), 0);
        assert_eq!(d.last_fired(&id(1)), None);
    }

    #[test]
    fn debounce_is_per_identity() {
        let (mut d, reg, gate) = fixture(Mode::Live);
        reg.upsert(id(61), "Other", Action::write_text("x").unwrap())
            .unwrap();
        let a = d.decide(&TriggerEvent::new(id(60), 0, at(0)), &reg, &gate);
        let b = d.decide(&TriggerEvent::new(id(61), 0, at(10)), &reg, &gate);
        assert!(matches!(a, Decision::Execute(_)));
        assert!(matches!(b, Decision::Execute(_)));
    }

    #[test]
    fn outcomes_at_decision_time() {
        let (mut d, reg, gate) = fixture(Mode::Live);
        let first = d.decide(&TriggerEvent::new(id(60), 0, at(0)), &reg, &gate);
        let second = d.decide(&TriggerEvent::new(id(60), 0, at(100)), &reg, &gate);
        assert_eq!(first.immediate_outcome(), None);
        assert_eq!(second.immediate_outcome(), Some(Outcome::Suppressed));
        assert!(second.is_bound());
        assert_eq!(second.name(), "suppressed");
    }
}
