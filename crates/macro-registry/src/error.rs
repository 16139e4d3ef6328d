//! Registry and persistence errors.
use std::{path::PathBuf, result::Result as StdResult};

use midi_input::TriggerIdentity;
use thiserror::Error;

/// Crate-local `Result` alias using the registry error type.
pub type Result<T> = StdResult<T, Error>;

/// Errors from registry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// No macro is bound to the identity.
    #[error("No macro bound to {0}")]
    NotFound(TriggerIdentity),

    /// The action is not fully specified.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// The key sequence of a send-keys action did not parse.
    #[error("Invalid key sequence: {0}")]
    Keys(#[from] keyspec::Error),
}

/// Errors loading or saving a registry snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// The snapshot file could not be read.
    #[error("Failed to read {}: {message}", .path.display())]
    Read {
        /// Snapshot path.
        path: PathBuf,
        /// I/O error message.
        message: String,
    },

    /// The snapshot file is not valid.
    #[error("Failed to parse {}: {message}", .path.display())]
    Parse {
        /// Snapshot path.
        path: PathBuf,
        /// Decoder error message.
        message: String,
    },

    /// The snapshot could not be written.
    #[error("Failed to write {}: {message}", .path.display())]
    Write {
        /// Snapshot path.
        path: PathBuf,
        /// I/O error message.
        message: String,
    },

    /// Saving is disabled because the stored snapshot could not be restored
    /// or preserved; writing would destroy it.
    #[error("Saving disabled: {0}")]
    Disabled(String),

    /// The snapshot was written by an unknown format version.
    #[error("Unsupported snapshot version {0}")]
    Version(u32),
}
