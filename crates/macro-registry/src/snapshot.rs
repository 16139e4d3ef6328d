use midi_input::TriggerIdentity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Macro;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Complete ordered list of macros; the persisted form of a registry.
///
/// Records are decoded one by one: a record that does not decode lands in
/// `rejected` instead of failing the whole snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredSnapshot")]
pub struct RegistrySnapshot {
    /// Format version.
    pub version: u32,
    /// Macros in display order.
    pub macros: Vec<Macro>,
    /// Stored records that could not be decoded. Never written back.
    #[serde(skip)]
    pub rejected: Vec<RejectedRecord>,
}

/// A stored record that was dropped on restore.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedRecord {
    /// Identity of the record, when that much was readable.
    pub identity: Option<TriggerIdentity>,
    /// Why it was dropped.
    pub reason: String,
}

/// Snapshot as read from storage, records still undecoded.
#[derive(Deserialize)]
struct StoredSnapshot {
    /// Format version.
    version: u32,
    /// Raw macro records.
    #[serde(default)]
    macros: Vec<Value>,
}

impl From<StoredSnapshot> for RegistrySnapshot {
    fn from(stored: StoredSnapshot) -> Self {
        let mut macros = Vec::with_capacity(stored.macros.len());
        let mut rejected = Vec::new();
        for record in stored.macros {
            let identity = record
                .get("identity")
                .and_then(|v| TriggerIdentity::deserialize(v).ok());
            match Macro::deserialize(record) {
                Ok(m) => macros.push(m),
                Err(e) => rejected.push(RejectedRecord {
                    identity,
                    reason: e.to_string(),
                }),
            }
        }
        Self {
            version: stored.version,
            macros,
            rejected,
        }
    }
}

impl Default for RegistrySnapshot {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RegistrySnapshot {
    /// Snapshot of `macros` at the current version.
    pub fn new(macros: Vec<Macro>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            macros,
            rejected: Vec::new(),
        }
    }
}

/// Outcome of restoring a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Number of macros restored.
    pub restored: usize,
    /// Later occurrences of an identity that were dropped.
    pub duplicates: Vec<TriggerIdentity>,
    /// Records dropped because they did not decode or their action was not
    /// fully specified.
    pub invalid: Vec<RejectedRecord>,
}

impl RestoreReport {
    /// True when any record was dropped.
    pub fn has_anomalies(&self) -> bool {
        !self.duplicates.is_empty() || !self.invalid.is_empty()
    }
}
