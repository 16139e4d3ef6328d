//! Front-end error type.
use std::{io, result};

use thiserror::Error;

/// Errors surfaced by the command-line front end.
#[derive(Debug, Error)]
pub enum Error {
    /// Engine operation failed.
    #[error(transparent)]
    Engine(#[from] macro_engine::Error),

    /// Macro definition was rejected.
    #[error(transparent)]
    Registry(#[from] macro_registry::Error),

    /// Reading the control stream failed.
    #[error("control input: {0}")]
    Io(#[from] io::Error),

    /// Command-line usage error.
    #[error("{0}")]
    Usage(String),
}

/// Result alias for the binary.
pub type Result<T> = result::Result<T, Error>;
