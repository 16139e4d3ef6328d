//! Types exchanged between the macro engine and its front end.
use std::{fmt, str::FromStr};

use midi_input::TriggerIdentity;
use serde::{Deserialize, Serialize};

/// Whether bound triggers execute their actions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Triggers are reported but never executed.
    #[default]
    Test,
    /// Bound triggers execute their actions.
    Live,
}

impl Mode {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Live => "live",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Self::Test),
            "live" => Ok(Self::Live),
            other => Err(format!("unknown mode {other:?} (expected test or live)")),
        }
    }
}

/// State of the device connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No device is open.
    #[default]
    Disconnected,
    /// A device is open and delivering messages.
    Connected {
        /// Port name.
        port: String,
    },
    /// The last connection attempt or the open connection failed.
    Error {
        /// Failure description.
        reason: String,
    },
}

impl ConnectionStatus {
    /// True while a device is open.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connected { port } => write!(f, "connected to {port}"),
            Self::Error { reason } => write!(f, "error: {reason}"),
        }
    }
}

/// Result of handling one bound trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The action was delivered to the host.
    Success,
    /// The action was attempted and failed.
    Failed {
        /// Failure description.
        reason: String,
    },
    /// Dropped by the debounce window.
    Suppressed,
    /// Recognized while in test mode; nothing executed.
    SkippedTestMode,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::Suppressed => f.write_str("suppressed"),
            Self::SkippedTestMode => f.write_str("skipped (test mode)"),
        }
    }
}

/// IPC-related helpers: channel aliases.
pub mod ipc {
    use super::MsgToUI;

    /// Tokio unbounded sender for UI messages.
    pub type UiTx = tokio::sync::mpsc::UnboundedSender<MsgToUI>;
    /// Tokio unbounded receiver for UI messages.
    pub type UiRx = tokio::sync::mpsc::UnboundedReceiver<MsgToUI>;

    /// Create a standard unbounded UI channel (sender, receiver).
    pub fn ui_channel() -> (UiTx, UiRx) {
        tokio::sync::mpsc::unbounded_channel::<MsgToUI>()
    }
}

/// Messages sent from the engine to the front end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MsgToUI {
    /// The connection status changed.
    ConnectionStatus(ConnectionStatus),

    /// The execution mode changed.
    ModeChanged(Mode),

    /// A trigger event reached the dispatcher.
    TriggerFired {
        /// Identity of the fired trigger.
        identity: TriggerIdentity,
        /// Whether a macro is bound to the identity.
        bound: bool,
    },

    /// A bound trigger was handled.
    ExecutionResult {
        /// Identity of the handled trigger.
        identity: TriggerIdentity,
        /// How it was handled.
        outcome: Outcome,
    },

    /// A pending capture received its trigger.
    TriggerCaptured {
        /// Identity of the captured trigger.
        identity: TriggerIdentity,
    },

    /// A pending capture was abandoned.
    CaptureCancelled,

    /// The registry contents changed.
    RegistryChanged,

    /// Notification request for the UI
    Notify {
        /// Severity.
        kind: NotifyKind,
        /// Short heading.
        title: String,
        /// Body text.
        text: String,
    },
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotifyKind {
    /// Informational.
    Info,
    /// Recoverable problem.
    Warn,
    /// Failed operation.
    Error,
    /// Completed operation.
    Success,
}
