//! Persistence adapters for registry snapshots.
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{PersistenceError, RegistrySnapshot, SNAPSHOT_VERSION};

/// Durable storage for the registry snapshot.
///
/// `save` replaces the stored snapshot entirely; a reader never observes a
/// partially written one.
pub trait MacroStore: Send + Sync {
    /// Load the stored snapshot. A store that has never been written yields
    /// an empty snapshot.
    fn load(&self) -> Result<RegistrySnapshot, PersistenceError>;

    /// Replace the stored snapshot.
    fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), PersistenceError>;

    /// Copy the stored snapshot aside, untouched, so that a later `save`
    /// cannot destroy records that failed to load. Returns where the copy
    /// went, or `None` when nothing is stored.
    fn back_up(&self) -> Result<Option<PathBuf>, PersistenceError>;
}

/// Highest numbered backup tried before giving up.
const MAX_BACKUPS: usize = 100;

/// Snapshot stored as pretty-printed JSON in a single file.
///
/// Saves write a sibling temporary file and rename it over the target.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/macros.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(crate::MACROS_FILE))
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling of the backing file with `suffix` appended to its name.
    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn tmp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    /// First unused backup path: `<name>.bad`, then `<name>.bad.1`, ...
    fn free_backup_path(&self) -> Option<PathBuf> {
        (0..MAX_BACKUPS)
            .map(|n| match n {
                0 => self.sibling(".bad"),
                n => self.sibling(&format!(".bad.{n}")),
            })
            .find(|p| !p.exists())
    }

    fn write_err(&self, e: impl ToString) -> PersistenceError {
        PersistenceError::Write {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }
}

impl MacroStore for JsonFileStore {
    fn load(&self) -> Result<RegistrySnapshot, PersistenceError> {
        let source = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "snapshot_missing");
                return Ok(RegistrySnapshot::default());
            }
            Err(e) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    message: e.to_string(),
                });
            }
        };
        let snapshot: RegistrySnapshot =
            serde_json::from_str(&source).map_err(|e| PersistenceError::Parse {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::Version(snapshot.version));
        }
        info!(
            path = %self.path.display(),
            macros = snapshot.macros.len(),
            "snapshot_loaded"
        );
        Ok(snapshot)
    }

    fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.write_err(e))?;
        }
        let body = serde_json::to_string_pretty(snapshot).map_err(|e| self.write_err(e))?;
        let tmp = self.tmp_path();
        fs::write(&tmp, body).map_err(|e| self.write_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            self.write_err(e)
        })?;
        debug!(
            path = %self.path.display(),
            macros = snapshot.macros.len(),
            "snapshot_saved"
        );
        Ok(())
    }

    fn back_up(&self) -> Result<Option<PathBuf>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let backup = self
            .free_backup_path()
            .ok_or_else(|| self.write_err("no free backup name"))?;
        fs::copy(&self.path, &backup).map_err(|e| PersistenceError::Write {
            path: backup.clone(),
            message: e.to_string(),
        })?;
        info!(path = %self.path.display(), backup = %backup.display(), "snapshot_backed_up");
        Ok(Some(backup))
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<RegistrySnapshot>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
    backups: Mutex<Vec<RegistrySnapshot>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `snapshot`.
    pub fn with_snapshot(snapshot: RegistrySnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Last saved snapshot, if any.
    pub fn stored(&self) -> Option<RegistrySnapshot> {
        self.snapshot.lock().clone()
    }

    /// Snapshots copied aside by `back_up`, oldest first.
    pub fn backups(&self) -> Vec<RegistrySnapshot> {
        self.backups.lock().clone()
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl MacroStore for MemoryStore {
    fn load(&self) -> Result<RegistrySnapshot, PersistenceError> {
        Ok(self.snapshot.lock().clone().unwrap_or_default())
    }

    fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), PersistenceError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::Write {
                path: PathBuf::from("<memory>"),
                message: "save disabled".into(),
            });
        }
        *self.snapshot.lock() = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn back_up(&self) -> Result<Option<PathBuf>, PersistenceError> {
        let Some(snapshot) = self.snapshot.lock().clone() else {
            return Ok(None);
        };
        let mut backups = self.backups.lock();
        backups.push(snapshot);
        Ok(Some(PathBuf::from(format!("<memory backup {}>", backups.len()))))
    }
}

#[cfg(test)]
mod tests {
    use midi_input::{MessageKind, TriggerIdentity};
    use tempfile::TempDir;

    use super::*;
    use crate::{Action, Macro};

    fn sample() -> RegistrySnapshot {
        RegistrySnapshot::new(vec![
            Macro::new(
                TriggerIdentity::note_on(0, 60),
                Action::write_text("hi").unwrap(),
            ),
            Macro::named(
                TriggerIdentity::new(MessageKind::NoteOff, 9, 36),
                "Copy",
                Action::send_keys("ctrl+c").unwrap(),
            ),
        ])
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), RegistrySnapshot::default());
    }

    #[test]
    fn save_then_load_preserves_order_and_names() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("macros.json"));
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn on_disk_format() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        store.save(&sample()).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(v["version"], 1);
        assert_eq!(v["macros"][0]["identity"]["kind"], "note_on");
        assert_eq!(v["macros"][0]["name"], "Note On | Ch.0 | Note 60");
        assert_eq!(v["macros"][0]["action"]["type"], "write_text");
        assert_eq!(v["macros"][1]["action"]["keys"], "ctrl+c");
    }

    #[test]
    fn corrupt_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(PersistenceError::Parse { .. })));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        fs::write(store.path(), r#"{"version":7,"macros":[]}"#).unwrap();
        assert_eq!(store.load(), Err(PersistenceError::Version(7)));
    }

    #[test]
    fn one_bad_record_keeps_the_rest_loadable() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        let body = r#"{"version":1,"macros":[
            {"identity":{"kind":"note_on","channel":0,"number":60},"name":"Keep me",
             "action":{"type":"write_text","text":"hi"}},
            {"identity":{"kind":"note_on","channel":0,"number":61},"name":"Broken",
             "action":{"type":"send_keys","keys":"ctrl+"}}
        ]}"#;
        fs::write(store.path(), body).unwrap();
        let snap = store.load().unwrap();
        assert_eq!(snap.macros.len(), 1);
        assert_eq!(snap.macros[0].name, "Keep me");
        assert_eq!(
            snap.rejected[0].identity,
            Some(TriggerIdentity::note_on(0, 61))
        );
    }

    #[test]
    fn back_up_copies_without_touching_the_original() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        assert_eq!(store.back_up().unwrap(), None);
        fs::write(store.path(), "{not json").unwrap();
        let first = store.back_up().unwrap().unwrap();
        let second = store.back_up().unwrap().unwrap();
        assert_eq!(first, dir.path().join("macros.json.bad"));
        assert_eq!(second, dir.path().join("macros.json.bad.1"));
        assert_eq!(fs::read_to_string(&first).unwrap(), "{not json");
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{not json");
    }

    #[test]
    fn memory_store_counts_and_fails_on_demand() {
        let store = MemoryStore::new();
        store.save(&sample()).unwrap();
        assert_eq!(store.saves(), 1);
        store.set_fail_saves(true);
        assert!(store.save(&RegistrySnapshot::default()).is_err());
        assert_eq!(store.saves(), 1);
        assert_eq!(store.load().unwrap(), sample());
    }
}
