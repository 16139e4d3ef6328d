use std::{collections::BTreeSet, fmt};

use crate::{Key, Modifier};

/// A key chord: a set of modifiers plus a single key.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Chord {
    /// Set of modifier keys held down for this chord.
    pub modifiers: BTreeSet<Modifier>,
    /// The non-modifier key for this chord.
    pub key: Key,
}

impl Chord {
    /// A chord with no modifiers.
    pub fn key(key: Key) -> Self {
        Self {
            modifiers: BTreeSet::new(),
            key,
        }
    }

    /// Parses a chord specification of the form "ctrl+shift+t".
    ///
    /// - Case-insensitive for both modifiers and the key.
    /// - Components are separated by "+"; the last component is always the key spec.
    /// - A trailing "++" names the plus key itself.
    pub fn parse(s: &str) -> Option<Self> {
        let (head, key_raw) = match s.strip_suffix("++") {
            Some(head) => (head, "+"),
            None => match s.rsplit_once('+') {
                Some((head, key)) => (head, key),
                None => ("", s),
            },
        };
        // keep raw to allow literal space
        let key = if key_raw == " " {
            Key::from_spec(" ")
        } else if key_raw == "+" {
            Some(Key::Char('+'))
        } else {
            Key::from_spec(key_raw.trim())
        }?;
        let mut modifiers = BTreeSet::new();
        if !head.is_empty() {
            for m in head.split('+') {
                let mt = m.trim();
                if mt.is_empty() {
                    return None;
                }
                modifiers.insert(Modifier::from_spec(mt)?);
            }
        }
        Some(Self { modifiers, key })
    }

    /// Canonical string form: modifiers in press order, then the key.
    pub fn to_string_canonical(&self) -> String {
        let mut out: Vec<String> = self.modifiers.iter().map(|m| m.to_spec().into()).collect();
        out.push(self.key.to_spec());
        out.join("+")
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_canonical())
    }
}
