//! Error types and result alias for key spec parsing.
use std::result::Result as StdResult;

use thiserror::Error;

/// Crate-local `Result` alias.
pub type Result<T> = StdResult<T, Error>;

/// Errors produced while parsing key specs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The sequence contained no chords.
    #[error("empty key sequence")]
    Empty,

    /// A chord component could not be parsed.
    #[error("invalid key combination {0:?}")]
    InvalidChord(String),
}
