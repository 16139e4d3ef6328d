//! Macro registry: the durable mapping from trigger identity to macro.
//!
//! - [`Action`]: what a macro does (send key chords or type text).
//! - [`Macro`]: identity + display name + action.
//! - [`Registry`]: thread-safe, insertion-ordered map of macros.
//! - [`RegistrySnapshot`]: the serializable form exchanged with a [`MacroStore`].
//! - [`JsonFileStore`] / [`MemoryStore`]: persistence adapters.
use std::{env, path::PathBuf};

mod action;
mod error;
mod macros;
mod registry;
mod snapshot;
mod store;

pub use action::Action;
pub use error::{Error, PersistenceError, Result};
pub use macros::Macro;
pub use registry::Registry;
pub use snapshot::{RegistrySnapshot, RejectedRecord, RestoreReport, SNAPSHOT_VERSION};
pub use store::{JsonFileStore, MacroStore, MemoryStore};

/// Directory holding persisted state (`~/.midimacros`).
pub fn default_state_dir() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".midimacros");
    p
}

/// File name of the macro snapshot inside the state directory.
pub const MACROS_FILE: &str = "macros.json";
