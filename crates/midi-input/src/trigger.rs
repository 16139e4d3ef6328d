//! Trigger identity and trigger events.
use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{MessageKind, RawMessage};

/// Stable key of one physical control: (message kind, channel, number).
///
/// Velocity/value and timestamps are deliberately excluded, so the identity
/// survives reconnects and process restarts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerIdentity {
    /// Message kind.
    pub kind: MessageKind,
    /// MIDI channel (0-15).
    pub channel: u8,
    /// Note or controller number.
    pub number: u8,
}

impl TriggerIdentity {
    /// Construct an identity from parts.
    pub fn new(kind: MessageKind, channel: u8, number: u8) -> Self {
        Self {
            kind,
            channel,
            number,
        }
    }

    /// Note-on identity shorthand.
    pub fn note_on(channel: u8, number: u8) -> Self {
        Self::new(MessageKind::NoteOn, channel, number)
    }

    /// Derive the identity of a raw channel message, if it has one.
    pub fn of(msg: &RawMessage) -> Option<Self> {
        Some(Self::new(msg.kind, msg.channel?, msg.data1?))
    }

    /// Default display name, e.g. `Note On | Ch.0 | Note 60`.
    pub fn label(&self) -> String {
        let number = match self.kind {
            MessageKind::ControlChange => format!("CC {}", self.number),
            MessageKind::ProgramChange => format!("Prog {}", self.number),
            _ => format!("Note {}", self.number),
        };
        format!("{} | Ch.{} | {}", self.kind.title(), self.channel, number)
    }
}

impl fmt::Display for TriggerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.channel, self.number)
    }
}

/// Error parsing the textual `kind:channel:number` identity form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid trigger identity {input:?}: expected kind:channel:number (e.g. note_on:0:60)")]
pub struct ParseIdentityError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for TriggerIdentity {
    type Err = ParseIdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseIdentityError {
            input: s.to_string(),
        };
        let mut parts = s.split(':');
        let (Some(kind), Some(channel), Some(number), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(err());
        };
        let kind = MessageKind::from_name(kind).ok_or_else(err)?;
        let channel: u8 = channel.trim().parse().map_err(|_| err())?;
        let number: u8 = number.trim().parse().map_err(|_| err())?;
        if channel > 15 || number > 127 {
            return Err(err());
        }
        Ok(Self::new(kind, channel, number))
    }
}

/// One occurrence of a trigger; produced by the normalizer, consumed once.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TriggerEvent {
    /// Which control fired.
    pub identity: TriggerIdentity,
    /// Raw value (velocity) carried by the message.
    pub value: u8,
    /// Monotonic receipt time relative to the engine clock epoch.
    pub timestamp: Duration,
}

impl TriggerEvent {
    /// Build an event at `timestamp`.
    pub fn new(identity: TriggerIdentity, value: u8, timestamp: Duration) -> Self {
        Self {
            identity,
            value,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_formats() {
        assert_eq!(
            TriggerIdentity::note_on(0, 60).label(),
            "Note On | Ch.0 | Note 60"
        );
        assert_eq!(
            TriggerIdentity::new(MessageKind::ControlChange, 2, 7).label(),
            "Control Change | Ch.2 | CC 7"
        );
    }

    #[test]
    fn textual_form_roundtrips() {
        let id = TriggerIdentity::new(MessageKind::NoteOff, 9, 36);
        assert_eq!(id.to_string(), "note_off:9:36");
        assert_eq!("note_off:9:36".parse::<TriggerIdentity>(), Ok(id));
    }

    #[test]
    fn textual_form_rejects_garbage() {
        for bad in ["", "note_on", "note_on:0", "note_on:0:60:1", "nope:0:1", "note_on:16:1"] {
            assert!(bad.parse::<TriggerIdentity>().is_err(), "{bad}");
        }
    }

    #[test]
    fn serializes_as_record() {
        let id = TriggerIdentity::note_on(0, 60);
        let json = serde_json::to_string(&id).expect("ser");
        assert_eq!(json, r#"{"kind":"note_on","channel":0,"number":60}"#);
    }
}
