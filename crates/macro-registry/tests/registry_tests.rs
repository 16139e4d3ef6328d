use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use macro_registry::{Action, JsonFileStore, MacroStore, Registry};
use midi_input::{MessageKind, TriggerIdentity};
use proptest::prelude::*;
use tempfile::TempDir;

#[derive(Clone, Debug)]
enum Op {
    Upsert(u8, String, String),
    Rename(u8, String),
    SetText(u8, String),
    Remove(u8),
}

fn id(n: u8) -> TriggerIdentity {
    TriggerIdentity::new(MessageKind::NoteOn, n % 16, n)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let num = 0u8..8;
    let word = "[a-z]{1,8}";
    prop_oneof![
        (num.clone(), word, word).prop_map(|(n, name, text)| Op::Upsert(n, name, text)),
        (num.clone(), word).prop_map(|(n, name)| Op::Rename(n, name)),
        (num.clone(), word).prop_map(|(n, text)| Op::SetText(n, text)),
        num.prop_map(Op::Remove),
    ]
}

fn apply(r: &Registry, op: &Op) {
    // Operations on unbound identities are expected to fail without effect.
    let _ = match op {
        Op::Upsert(n, name, text) => {
            r.upsert(id(*n), name.clone(), Action::write_text(text.clone()).unwrap())
        }
        Op::Rename(n, name) => r.rename(&id(*n), name.clone()),
        Op::SetText(n, text) => r.set_action(&id(*n), Action::write_text(text.clone()).unwrap()),
        Op::Remove(n) => r.remove(&id(*n)).map(|_| ()),
    };
}

proptest! {
    #[test]
    fn snapshot_survives_store_round_trip(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let r = Registry::new();
        for op in &ops {
            apply(&r, op);
        }
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        store.save(&r.snapshot()).unwrap();
        let (restored, report) = Registry::from_snapshot(store.load().unwrap());
        prop_assert!(!report.has_anomalies());
        prop_assert_eq!(restored.list(), r.list());
    }

    #[test]
    fn identities_are_unique(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let r = Registry::new();
        for op in &ops {
            apply(&r, op);
        }
        let mut ids: Vec<_> = r.list().into_iter().map(|m| m.identity).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), total);
    }
}

/// Readers racing a writer see each macro as wholly old or wholly new.
#[test]
fn concurrent_reads_never_observe_torn_macros() {
    let r = Arc::new(Registry::new());
    let target = id(1);
    r.upsert(target, "v0", Action::write_text("v0").unwrap())
        .unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let r = r.clone();
            let done = done.clone();
            thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    let m = r.lookup(&target).expect("bound throughout");
                    let Action::WriteText { text } = &m.action else {
                        panic!("unexpected action kind");
                    };
                    assert_eq!(&m.name, text, "name and action from different writes");
                }
            })
        })
        .collect();

    for i in 1..500 {
        let v = format!("v{i}");
        r.upsert(target, v.clone(), Action::write_text(v).unwrap())
            .unwrap();
    }
    done.store(true, Ordering::Relaxed);
    for h in readers {
        h.join().unwrap();
    }
    assert_eq!(r.lookup(&target).unwrap().name, "v499");
}
