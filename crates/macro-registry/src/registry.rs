//! Thread-safe, insertion-ordered macro registry.
//!
//! All state sits behind one `RwLock`, so a reader sees either the whole
//! effect of a mutation or none of it. `parking_lot` locks are fair: a writer
//! queued behind a busy dispatch loop is not starved by later readers.
use std::collections::HashMap;

use midi_input::TriggerIdentity;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{Action, Error, Macro, RegistrySnapshot, RejectedRecord, RestoreReport, Result};

/// Registry contents.
#[derive(Default)]
struct Inner {
    /// Identities in insertion order.
    order: Vec<TriggerIdentity>,
    /// Macros by identity.
    macros: HashMap<TriggerIdentity, Macro>,
}

/// Mapping from trigger identity to macro.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a snapshot; see [`Registry::restore`].
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> (Self, RestoreReport) {
        let registry = Self::new();
        let report = registry.restore(snapshot);
        (registry, report)
    }

    /// Look up the macro bound to `identity`.
    pub fn lookup(&self, identity: &TriggerIdentity) -> Option<Macro> {
        self.inner.read().macros.get(identity).cloned()
    }

    /// True when `identity` is bound.
    pub fn contains(&self, identity: &TriggerIdentity) -> bool {
        self.inner.read().macros.contains_key(identity)
    }

    /// Number of macros.
    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    /// True when no macros are bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create or replace the macro for `identity`.
    ///
    /// Replacing keeps the macro's position in the display order.
    pub fn upsert(
        &self,
        identity: TriggerIdentity,
        name: impl Into<String>,
        action: Action,
    ) -> Result<()> {
        action.validate()?;
        let m = Macro::named(identity, name, action);
        let mut inner = self.inner.write();
        if inner.macros.insert(identity, m).is_none() {
            inner.order.push(identity);
            debug!(%identity, "macro_created");
        } else {
            debug!(%identity, "macro_replaced");
        }
        Ok(())
    }

    /// Change the display name of an existing macro.
    pub fn rename(&self, identity: &TriggerIdentity, name: impl Into<String>) -> Result<()> {
        let mut inner = self.inner.write();
        let m = inner
            .macros
            .get_mut(identity)
            .ok_or(Error::NotFound(*identity))?;
        m.name = name.into();
        Ok(())
    }

    /// Replace the action of an existing macro.
    pub fn set_action(&self, identity: &TriggerIdentity, action: Action) -> Result<()> {
        action.validate()?;
        let mut inner = self.inner.write();
        let m = inner
            .macros
            .get_mut(identity)
            .ok_or(Error::NotFound(*identity))?;
        m.action = action;
        Ok(())
    }

    /// Delete the macro for `identity`, returning it.
    pub fn remove(&self, identity: &TriggerIdentity) -> Result<Macro> {
        let mut inner = self.inner.write();
        let m = inner
            .macros
            .remove(identity)
            .ok_or(Error::NotFound(*identity))?;
        inner.order.retain(|id| id != identity);
        Ok(m)
    }

    /// All macros in display order.
    pub fn list(&self) -> Vec<Macro> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.macros.get(id).cloned())
            .collect()
    }

    /// Serializable copy of the full state.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot::new(self.list())
    }

    /// Replace the full state with `snapshot`.
    ///
    /// Duplicate identities keep their first occurrence; records with an
    /// invalid action are dropped. Both are reported and logged, never merged.
    pub fn restore(&self, snapshot: RegistrySnapshot) -> RestoreReport {
        let mut report = RestoreReport::default();
        for rejected in snapshot.rejected {
            warn!(identity = ?rejected.identity, reason = %rejected.reason, "snapshot_record_unreadable");
            report.invalid.push(rejected);
        }
        let mut next = Inner::default();
        for m in snapshot.macros {
            if next.macros.contains_key(&m.identity) {
                warn!(identity = %m.identity, "snapshot_duplicate_identity_dropped");
                report.duplicates.push(m.identity);
                continue;
            }
            if let Err(e) = m.action.validate() {
                warn!(identity = %m.identity, error = %e, "snapshot_invalid_action_dropped");
                report.invalid.push(RejectedRecord {
                    identity: Some(m.identity),
                    reason: e.to_string(),
                });
                continue;
            }
            next.order.push(m.identity);
            next.macros.insert(m.identity, m);
        }
        report.restored = next.order.len();
        *self.inner.write() = next;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> TriggerIdentity {
        TriggerIdentity::note_on(0, n)
    }

    fn text(s: &str) -> Action {
        Action::write_text(s).unwrap()
    }

    #[test]
    fn upsert_then_lookup() {
        let r = Registry::new();
        r.upsert(id(60), "Pad", text("hi")).unwrap();
        let m = r.lookup(&id(60)).expect("bound");
        assert_eq!(m.name, "Pad");
        assert_eq!(m.action, text("hi"));
        assert!(r.lookup(&id(61)).is_none());
    }

    #[test]
    fn upsert_replaces_in_place() {
        let r = Registry::new();
        r.upsert(id(1), "a", text("a")).unwrap();
        r.upsert(id(2), "b", text("b")).unwrap();
        r.upsert(id(1), "a2", text("a2")).unwrap();
        let names: Vec<_> = r.list().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["a2", "b"]);
    }

    #[test]
    fn rename_does_not_reorder() {
        let r = Registry::new();
        r.upsert(id(1), "z", text("a")).unwrap();
        r.upsert(id(2), "a", text("b")).unwrap();
        r.rename(&id(1), "renamed").unwrap();
        let ids: Vec<_> = r.list().into_iter().map(|m| m.identity).collect();
        assert_eq!(ids, vec![id(1), id(2)]);
    }

    #[test]
    fn missing_identity_is_not_found_and_unmodified() {
        let r = Registry::new();
        r.upsert(id(1), "a", text("a")).unwrap();
        let before = r.snapshot();
        assert_eq!(r.rename(&id(9), "x"), Err(Error::NotFound(id(9))));
        assert_eq!(r.set_action(&id(9), text("x")), Err(Error::NotFound(id(9))));
        assert_eq!(r.remove(&id(9)), Err(Error::NotFound(id(9))));
        assert_eq!(r.snapshot(), before);
    }

    #[test]
    fn remove_drops_from_order() {
        let r = Registry::new();
        r.upsert(id(1), "a", text("a")).unwrap();
        r.upsert(id(2), "b", text("b")).unwrap();
        let gone = r.remove(&id(1)).unwrap();
        assert_eq!(gone.name, "a");
        assert_eq!(r.len(), 1);
        assert!(!r.contains(&id(1)));
    }

    #[test]
    fn restore_keeps_first_duplicate_and_flags_it() {
        let snap = RegistrySnapshot::new(vec![
            Macro::named(id(1), "first", text("first")),
            Macro::named(id(2), "other", text("other")),
            Macro::named(id(1), "second", text("second")),
        ]);
        let (r, report) = Registry::from_snapshot(snap);
        assert_eq!(report.duplicates, vec![id(1)]);
        assert_eq!(report.restored, 2);
        assert!(report.has_anomalies());
        assert_eq!(r.lookup(&id(1)).unwrap().name, "first");
    }

    #[test]
    fn restore_drops_partial_actions() {
        let snap = RegistrySnapshot::new(vec![Macro::named(
            id(1),
            "empty",
            Action::WriteText {
                text: String::new(),
            },
        )]);
        let (r, report) = Registry::from_snapshot(snap);
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.invalid[0].identity, Some(id(1)));
        assert!(r.is_empty());
    }

    #[test]
    fn restore_reports_undecodable_records() {
        let mut snap = RegistrySnapshot::new(vec![Macro::named(id(1), "ok", text("ok"))]);
        snap.rejected.push(RejectedRecord {
            identity: Some(id(2)),
            reason: "invalid key combination".into(),
        });
        let (r, report) = Registry::from_snapshot(snap);
        assert_eq!(report.restored, 1);
        assert_eq!(report.invalid[0].identity, Some(id(2)));
        assert!(report.has_anomalies());
        assert!(r.contains(&id(1)));
    }
}
