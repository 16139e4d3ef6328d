use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Chord, Error, Result};

/// Ordered, non-empty list of chords, e.g. `ctrl+c, ctrl+v`.
///
/// Serializes as its canonical spec string.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeySequence {
    /// The chords, in send order. Never empty.
    chords: Vec<Chord>,
}

impl KeySequence {
    /// Parse a comma-separated sequence of chords.
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(Error::Empty);
        }
        let chords = s
            .split(',')
            .map(|part| {
                let part = part.trim();
                Chord::parse(part).ok_or_else(|| Error::InvalidChord(part.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { chords })
    }

    /// Build from already-parsed chords.
    pub fn from_chords(chords: Vec<Chord>) -> Result<Self> {
        if chords.is_empty() {
            return Err(Error::Empty);
        }
        Ok(Self { chords })
    }

    /// The chords in send order.
    pub fn chords(&self) -> &[Chord] {
        &self.chords
    }

    /// Number of chords.
    pub fn len(&self) -> usize {
        self.chords.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.chords.iter().map(Chord::to_string_canonical).collect();
        f.write_str(&parts.join(", "))
    }
}

impl FromStr for KeySequence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for KeySequence {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<KeySequence> for String {
    fn from(seq: KeySequence) -> Self {
        seq.to_string()
    }
}
