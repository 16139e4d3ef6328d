//! keyspec: platform-neutral key-combination specs.
//!
//! - [`Key`]: a non-modifier key (character, function key, or named key).
//! - [`Modifier`]: modifier keys with alias parsing (ctrl/alt/cmd/...).
//! - [`Chord`]: modifiers plus one key, parsed from `"ctrl+shift+t"`.
//! - [`KeySequence`]: an ordered, non-empty list of chords, parsed from
//!   `"ctrl+c, ctrl+v"`.
//!
//! Parsing is case-insensitive; `to_string` renders the canonical spec and
//! reparsing it yields an equal value.

mod chord;
mod error;
mod key;
mod modifier;
mod sequence;

pub use chord::Chord;
pub use error::{Error, Result};
pub use key::Key;
pub use modifier::Modifier;
pub use sequence::KeySequence;
