//! Raw MIDI message model and byte-level parser.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind tag of a MIDI message, as delivered by the device.
///
/// Note-on and note-off are distinct kinds: a note-on carrying velocity 0 is
/// not folded into a note-off.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Note released (0x8n).
    NoteOff,
    /// Note pressed (0x9n).
    NoteOn,
    /// Per-note aftertouch (0xAn).
    PolyPressure,
    /// Controller change (0xBn).
    ControlChange,
    /// Program change (0xCn).
    ProgramChange,
    /// Channel aftertouch (0xDn).
    ChannelPressure,
    /// Pitch bend (0xEn).
    PitchBend,
    /// System exclusive; not interpreted.
    SysEx,
    /// MTC quarter frame.
    QuarterFrame,
    /// Song position pointer.
    SongPosition,
    /// Song select.
    SongSelect,
    /// Tune request.
    TuneRequest,
    /// Timing clock.
    Clock,
    /// Sequence start.
    Start,
    /// Sequence continue.
    Continue,
    /// Sequence stop.
    Stop,
    /// Active sensing keepalive.
    ActiveSensing,
    /// System reset.
    Reset,
}

/// All kinds, in status-byte order.
const ALL_KINDS: [MessageKind; 18] = [
    MessageKind::NoteOff,
    MessageKind::NoteOn,
    MessageKind::PolyPressure,
    MessageKind::ControlChange,
    MessageKind::ProgramChange,
    MessageKind::ChannelPressure,
    MessageKind::PitchBend,
    MessageKind::SysEx,
    MessageKind::QuarterFrame,
    MessageKind::SongPosition,
    MessageKind::SongSelect,
    MessageKind::TuneRequest,
    MessageKind::Clock,
    MessageKind::Start,
    MessageKind::Continue,
    MessageKind::Stop,
    MessageKind::ActiveSensing,
    MessageKind::Reset,
];

impl MessageKind {
    /// Canonical lowercase spec name (`note_on`, `control_change`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::NoteOff => "note_off",
            Self::NoteOn => "note_on",
            Self::PolyPressure => "poly_pressure",
            Self::ControlChange => "control_change",
            Self::ProgramChange => "program_change",
            Self::ChannelPressure => "channel_pressure",
            Self::PitchBend => "pitch_bend",
            Self::SysEx => "sysex",
            Self::QuarterFrame => "quarter_frame",
            Self::SongPosition => "song_position",
            Self::SongSelect => "song_select",
            Self::TuneRequest => "tune_request",
            Self::Clock => "clock",
            Self::Start => "start",
            Self::Continue => "continue",
            Self::Stop => "stop",
            Self::ActiveSensing => "active_sensing",
            Self::Reset => "reset",
        }
    }

    /// Human-readable title used in generated labels ("Note On").
    pub fn title(self) -> String {
        self.name()
            .split('_')
            .map(|w| {
                let mut cs = w.chars();
                match cs.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + cs.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parse a spec name produced by [`MessageKind::name`].
    pub fn from_name(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        ALL_KINDS.iter().copied().find(|k| k.name() == s)
    }

    /// True for timing/keepalive messages that are never user-actionable.
    pub fn is_timing(self) -> bool {
        matches!(
            self,
            Self::Clock | Self::ActiveSensing | Self::QuarterFrame
        )
    }

    /// True for the note-class kinds that carry a velocity byte.
    pub fn is_note(self) -> bool {
        matches!(self, Self::NoteOn | Self::NoteOff)
    }

    /// True for channel voice messages (status 0x80..=0xEF).
    pub fn is_channel(self) -> bool {
        matches!(
            self,
            Self::NoteOff
                | Self::NoteOn
                | Self::PolyPressure
                | Self::ControlChange
                | Self::ProgramChange
                | Self::ChannelPressure
                | Self::PitchBend
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A device message with its kind tag and the bytes that apply to it.
///
/// `data1` is the note/controller/program number and `data2` the
/// velocity/value, where the kind carries them.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawMessage {
    /// Message kind tag.
    pub kind: MessageKind,
    /// Channel (0-15) for channel voice messages.
    pub channel: Option<u8>,
    /// First data byte.
    pub data1: Option<u8>,
    /// Second data byte.
    pub data2: Option<u8>,
}

impl RawMessage {
    /// Build a channel message with two data bytes.
    pub fn channel(kind: MessageKind, channel: u8, data1: u8, data2: u8) -> Self {
        Self {
            kind,
            channel: Some(channel & 0x0F),
            data1: Some(data1),
            data2: Some(data2),
        }
    }

    /// Build a system message without data.
    pub fn system(kind: MessageKind) -> Self {
        Self {
            kind,
            channel: None,
            data1: None,
            data2: None,
        }
    }

    /// Note-on convenience constructor.
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel(MessageKind::NoteOn, channel, note, velocity)
    }

    /// Note-off convenience constructor.
    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel(MessageKind::NoteOff, channel, note, velocity)
    }

    /// Velocity of a note-class message.
    pub fn velocity(&self) -> Option<u8> {
        if self.kind.is_note() {
            self.data2
        } else {
            None
        }
    }
}

impl fmt::Display for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(ch) = self.channel {
            write!(f, " Ch:{ch}")?;
        }
        match self.kind {
            MessageKind::NoteOn | MessageKind::NoteOff | MessageKind::PolyPressure => {
                if let Some(n) = self.data1 {
                    write!(f, " Note:{n}")?;
                }
                if let Some(v) = self.data2 {
                    write!(f, " Vel:{v}")?;
                }
            }
            MessageKind::ControlChange => {
                if let Some(n) = self.data1 {
                    write!(f, " CC:{n}")?;
                }
                if let Some(v) = self.data2 {
                    write!(f, " Val:{v}")?;
                }
            }
            MessageKind::ProgramChange => {
                if let Some(n) = self.data1 {
                    write!(f, " Prog:{n}")?;
                }
            }
            _ => {
                if let Some(v) = self.data1 {
                    write!(f, " {v}")?;
                }
                if let Some(v) = self.data2 {
                    write!(f, " {v}")?;
                }
            }
        }
        Ok(())
    }
}

/// Parse raw bytes as delivered by the transport into a [`RawMessage`].
///
/// Returns `None` for empty input, data bytes without a status byte (running
/// status is not interpreted), undefined status bytes, and truncated messages.
pub fn parse(data: &[u8]) -> Option<RawMessage> {
    let (&status, rest) = data.split_first()?;
    if status < 0x80 {
        return None;
    }
    if status < 0xF0 {
        let channel = status & 0x0F;
        let (kind, len) = match status & 0xF0 {
            0x80 => (MessageKind::NoteOff, 2),
            0x90 => (MessageKind::NoteOn, 2),
            0xA0 => (MessageKind::PolyPressure, 2),
            0xB0 => (MessageKind::ControlChange, 2),
            0xC0 => (MessageKind::ProgramChange, 1),
            0xD0 => (MessageKind::ChannelPressure, 1),
            _ => (MessageKind::PitchBend, 2),
        };
        if rest.len() < len {
            return None;
        }
        return Some(RawMessage {
            kind,
            channel: Some(channel),
            data1: Some(rest[0] & 0x7F),
            data2: (len == 2).then(|| rest[1] & 0x7F),
        });
    }
    let (kind, len) = match status {
        0xF0 => return Some(RawMessage::system(MessageKind::SysEx)),
        0xF1 => (MessageKind::QuarterFrame, 1),
        0xF2 => (MessageKind::SongPosition, 2),
        0xF3 => (MessageKind::SongSelect, 1),
        0xF6 => (MessageKind::TuneRequest, 0),
        0xF8 => (MessageKind::Clock, 0),
        0xFA => (MessageKind::Start, 0),
        0xFB => (MessageKind::Continue, 0),
        0xFC => (MessageKind::Stop, 0),
        0xFE => (MessageKind::ActiveSensing, 0),
        0xFF => (MessageKind::Reset, 0),
        _ => return None,
    };
    if rest.len() < len {
        return None;
    }
    Some(RawMessage {
        kind,
        channel: None,
        data1: (len >= 1).then(|| rest[0] & 0x7F),
        data2: (len == 2).then(|| rest[1] & 0x7F),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_note_on_with_channel() {
        let m = parse(&[0x93, 60, 100]).expect("parse");
        assert_eq!(m.kind, MessageKind::NoteOn);
        assert_eq!(m.channel, Some(3));
        assert_eq!(m.data1, Some(60));
        assert_eq!(m.velocity(), Some(100));
    }

    #[test]
    fn note_on_velocity_zero_stays_note_on() {
        let m = parse(&[0x90, 60, 0]).expect("parse");
        assert_eq!(m.kind, MessageKind::NoteOn);
        assert_eq!(m.velocity(), Some(0));
    }

    #[test]
    fn program_change_has_single_data_byte() {
        let m = parse(&[0xC1, 5]).expect("parse");
        assert_eq!(m.kind, MessageKind::ProgramChange);
        assert_eq!(m.data1, Some(5));
        assert_eq!(m.data2, None);
        assert_eq!(m.velocity(), None);
    }

    #[test]
    fn system_messages() {
        assert_eq!(parse(&[0xF8]).map(|m| m.kind), Some(MessageKind::Clock));
        assert_eq!(parse(&[0xFE]).map(|m| m.kind), Some(MessageKind::ActiveSensing));
        assert_eq!(parse(&[0xF0, 1, 2, 0xF7]).map(|m| m.kind), Some(MessageKind::SysEx));
        assert_eq!(parse(&[0xF4]), None);
    }

    #[test]
    fn rejects_truncated_and_running_status() {
        assert_eq!(parse(&[]), None);
        assert_eq!(parse(&[0x90, 60]), None);
        assert_eq!(parse(&[60, 100]), None);
    }

    #[test]
    fn kind_names_roundtrip() {
        for k in ALL_KINDS {
            assert_eq!(MessageKind::from_name(k.name()), Some(k));
        }
        assert_eq!(MessageKind::NoteOn.title(), "Note On");
        assert_eq!(MessageKind::from_name("bogus"), None);
    }

    #[test]
    fn display_matches_debug_log_layout() {
        let m = RawMessage::note_on(0, 60, 0);
        assert_eq!(m.to_string(), "[note_on] Ch:0 Note:60 Vel:0");
        let cc = RawMessage::channel(MessageKind::ControlChange, 1, 7, 127);
        assert_eq!(cc.to_string(), "[control_change] Ch:1 CC:7 Val:127");
    }
}
