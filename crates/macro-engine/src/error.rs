use std::result::Result as StdResult;

use macro_registry::PersistenceError;
use midi_input::TransportError;
use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the macro engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Opening or reading the device failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A registry operation was rejected.
    #[error("Registry error: {0}")]
    Registry(#[from] macro_registry::Error),

    /// Loading or saving the snapshot failed. For mutations the in-memory
    /// change has already been applied.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// A pending capture was cancelled or replaced.
    #[error("Capture cancelled")]
    CaptureCancelled,

    /// The dispatch loop was already started.
    #[error("Dispatch loop already running")]
    AlreadyRunning,

    /// The UI event channel has been closed by the receiver.
    #[error("UI channel closed")]
    ChannelClosed,

    /// A blocking worker task failed to complete.
    #[error("Worker task failed: {0}")]
    Join(String),
}

/// Failure executing an action on the host.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The host refused or failed the input injection.
    #[error(transparent)]
    Injection(#[from] relaykey::Error),

    /// The execution worker panicked or was cancelled.
    #[error("Execution worker failed: {0}")]
    Worker(String),
}
