//! Error types and result alias for the relaykey crate.
use std::result::Result as StdResult;

use thiserror::Error;

/// Crate-local `Result` alias using the relay error type.
pub type Result<T> = StdResult<T, Error>;

/// Errors that can occur while synthesizing or posting events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The host refused a connection to its input-injection facility
    /// (missing permission, no display session).
    #[error("Input injection unavailable: {0}")]
    Unavailable(String),
    /// The host rejected an individual synthetic event.
    #[error("Failed to post input event: {0}")]
    Post(String),
    /// Nothing to send.
    #[error("Nothing to send: {0}")]
    Empty(&'static str),
}
