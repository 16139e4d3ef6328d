use keyspec::KeySequence;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Characters of typed text shown in summaries before eliding.
const SUMMARY_TEXT_CHARS: usize = 30;

/// What a macro does when its trigger fires.
///
/// Closed set: the executor matches exhaustively. A constructed `Action` is
/// always fully specified; use the checked constructors.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Synthesize an ordered sequence of key chords.
    SendKeys {
        /// Chords to send, in order.
        keys: KeySequence,
    },
    /// Type a literal string.
    WriteText {
        /// Text to type; never empty.
        text: String,
    },
}

impl Action {
    /// Send-keys action from a spec such as `"ctrl+c, ctrl+v"`.
    pub fn send_keys(spec: &str) -> Result<Self> {
        Ok(Self::SendKeys {
            keys: KeySequence::parse(spec)?,
        })
    }

    /// Write-text action; empty text is rejected.
    pub fn write_text(text: impl Into<String>) -> Result<Self> {
        let action = Self::WriteText { text: text.into() };
        action.validate()?;
        Ok(action)
    }

    /// Check the action is fully specified.
    ///
    /// Needed for values that bypassed the constructors (deserialization).
    pub fn validate(&self) -> Result<()> {
        match self {
            // Key sequences are non-empty by construction.
            Self::SendKeys { .. } => Ok(()),
            Self::WriteText { text } if text.is_empty() => {
                Err(Error::InvalidAction("write_text requires non-empty text".into()))
            }
            Self::WriteText { .. } => Ok(()),
        }
    }

    /// Discriminator name used in snapshots and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SendKeys { .. } => "send_keys",
            Self::WriteText { .. } => "write_text",
        }
    }

    /// One-line description for listings.
    pub fn summary(&self) -> String {
        match self {
            Self::SendKeys { keys } => format!("Send Keys: {keys}"),
            Self::WriteText { text } => {
                let preview: String = text.chars().take(SUMMARY_TEXT_CHARS).collect();
                if text.chars().count() > SUMMARY_TEXT_CHARS {
                    format!("Write Text: {preview}...")
                } else {
                    format!("Write Text: {preview}")
                }
            }
        }
    }
}
