//! Transport error type.
use thiserror::Error;

/// Errors raised at the device boundary (open/enumerate/read).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The MIDI backend could not be initialized.
    #[error("MIDI backend unavailable: {0}")]
    Init(String),

    /// No input port with the requested name exists.
    #[error("MIDI port not found: {0}")]
    PortNotFound(String),

    /// The port exists but could not be opened.
    #[error("Failed to open MIDI port {port}: {message}")]
    Open {
        /// Name of the port we tried to open.
        port: String,
        /// Backend error message.
        message: String,
    },

    /// A later connect or disconnect replaced this connection while it was
    /// opening; the new connection was closed again.
    #[error("Connection to {0} was superseded")]
    Superseded(String),

    /// The open connection reported a failure while reading.
    #[error("MIDI read error: {0}")]
    Read(String),
}
