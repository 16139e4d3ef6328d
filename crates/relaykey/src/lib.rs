//! Synthesizes keyboard input on the host.
//!
//! A `RelayKey` posts key chords (modifiers held around a key click) and
//! typed text to whatever currently has keyboard focus. Injection goes
//! through `enigo`; a fresh connection is opened per chord or text, so a
//! `RelayKey` is cheap to clone and safe to share across threads.
//!
//! Success only means the host accepted the synthetic events; whether they
//! landed anywhere useful cannot be observed.
#![warn(missing_docs)]
use std::sync::Arc;

use enigo::{Direction, Enigo, Keyboard, Settings};
use keyspec::{Chord, Key, KeySequence, Modifier};
use tracing::{info, trace, warn};

mod error;

pub use error::{Error, Result};

/// Low-level sink for synthetic keyboard events.
pub(crate) trait Poster: Send + Sync {
    /// Press the chord's modifiers, click its key, release the modifiers.
    fn post_chord(&self, chord: &Chord) -> Result<()>;
    /// Type `text` character by character.
    fn post_text(&self, text: &str) -> Result<()>;
}

/// `enigo`-backed poster.
struct EnigoPoster;

impl EnigoPoster {
    /// Open an injection session.
    fn session() -> Result<Enigo> {
        Enigo::new(&Settings::default()).map_err(|e| {
            warn!(error = %e, "input_injection_unavailable");
            Error::Unavailable(e.to_string())
        })
    }

    /// Backend key for a chord key.
    fn map_key(key: Key) -> Result<enigo::Key> {
        use enigo::Key as E;
        Ok(match key {
            Key::Char(c) => E::Unicode(c),
            Key::F(n) => match n {
                1 => E::F1,
                2 => E::F2,
                3 => E::F3,
                4 => E::F4,
                5 => E::F5,
                6 => E::F6,
                7 => E::F7,
                8 => E::F8,
                9 => E::F9,
                10 => E::F10,
                11 => E::F11,
                12 => E::F12,
                13 => E::F13,
                14 => E::F14,
                15 => E::F15,
                16 => E::F16,
                17 => E::F17,
                18 => E::F18,
                19 => E::F19,
                20 => E::F20,
                _ => return Err(Error::Post(format!("no function key f{n}"))),
            },
            Key::Space => E::Space,
            Key::Enter => E::Return,
            Key::Escape => E::Escape,
            Key::Tab => E::Tab,
            Key::Backspace => E::Backspace,
            Key::Delete => E::Delete,
            Key::Up => E::UpArrow,
            Key::Down => E::DownArrow,
            Key::Left => E::LeftArrow,
            Key::Right => E::RightArrow,
            Key::Home => E::Home,
            Key::End => E::End,
            Key::PageUp => E::PageUp,
            Key::PageDown => E::PageDown,
        })
    }

    /// Backend key for a modifier.
    fn map_modifier(m: Modifier) -> enigo::Key {
        match m {
            Modifier::Control => enigo::Key::Control,
            Modifier::Alt => enigo::Key::Alt,
            Modifier::Shift => enigo::Key::Shift,
            Modifier::Meta => enigo::Key::Meta,
        }
    }
}

impl Poster for EnigoPoster {
    fn post_chord(&self, chord: &Chord) -> Result<()> {
        trace!(chord = %chord, "post_chord");
        let key = Self::map_key(chord.key)?;
        let mut enigo = Self::session()?;
        let mut pressed = Vec::new();
        let mut res = Ok(());
        for m in &chord.modifiers {
            if let Err(e) = enigo.key(Self::map_modifier(*m), Direction::Press) {
                res = Err(Error::Post(e.to_string()));
                break;
            }
            pressed.push(*m);
        }
        if res.is_ok() {
            res = enigo
                .key(key, Direction::Click)
                .map_err(|e| Error::Post(e.to_string()));
        }
        // Release in reverse order, even after a failure.
        for m in pressed.into_iter().rev() {
            if let Err(e) = enigo.key(Self::map_modifier(m), Direction::Release) {
                warn!(error = %e, "modifier_release_failed");
            }
        }
        if res.is_ok() {
            info!(chord = %chord, "relayed_chord");
        }
        res
    }

    fn post_text(&self, text: &str) -> Result<()> {
        trace!(len = text.chars().count(), "post_text");
        let mut enigo = Self::session()?;
        enigo.text(text).map_err(|e| Error::Post(e.to_string()))?;
        info!(chars = text.chars().count(), "relayed_text");
        Ok(())
    }
}

/// Posts synthetic keyboard input to the focused application.
#[derive(Clone)]
pub struct RelayKey {
    poster: Arc<dyn Poster>,
}

impl Default for RelayKey {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayKey {
    /// Create a relayer that injects through the host input facility.
    pub fn new() -> Self {
        Self {
            poster: Arc::new(EnigoPoster),
        }
    }

    /// Test helper to inject a custom poster.
    #[cfg(test)]
    pub(crate) fn new_with_poster(poster: Arc<dyn Poster>) -> Self {
        Self { poster }
    }

    /// Create a RelayKey with a mock poster for testing
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_with_mock_poster() -> Self {
        Self {
            poster: Arc::new(MockPoster),
        }
    }

    /// Send one chord.
    pub fn send_chord(&self, chord: &Chord) -> Result<()> {
        self.poster.post_chord(chord)
    }

    /// Send every chord of `seq` in order, stopping at the first failure.
    pub fn send_sequence(&self, seq: &KeySequence) -> Result<()> {
        if seq.is_empty() {
            return Err(Error::Empty("key sequence"));
        }
        for chord in seq.chords() {
            self.send_chord(chord)?;
        }
        Ok(())
    }

    /// Type `text` in order.
    pub fn type_text(&self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Err(Error::Empty("text"));
        }
        self.poster.post_text(text)
    }
}

#[cfg(any(test, feature = "test-utils"))]
struct MockPoster;

#[cfg(any(test, feature = "test-utils"))]
impl Poster for MockPoster {
    fn post_chord(&self, _chord: &Chord) -> Result<()> {
        Ok(())
    }
    fn post_text(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPoster {
        chords: Mutex<Vec<String>>,
        text: Mutex<String>,
        fail_on: Option<char>,
    }

    impl Poster for RecordingPoster {
        fn post_chord(&self, chord: &Chord) -> Result<()> {
            if self.fail_on.map(Key::Char) == Some(chord.key) {
                return Err(Error::Post("denied".into()));
            }
            self.chords.lock().unwrap().push(chord.to_string());
            Ok(())
        }
        fn post_text(&self, text: &str) -> Result<()> {
            self.text.lock().unwrap().push_str(text);
            Ok(())
        }
    }

    #[test]
    fn sequence_posts_each_chord_in_order() {
        let poster = Arc::new(RecordingPoster::default());
        let rk = RelayKey::new_with_poster(poster.clone());
        let seq = KeySequence::parse("ctrl+c, alt+tab, f5").unwrap();
        rk.send_sequence(&seq).unwrap();
        assert_eq!(
            *poster.chords.lock().unwrap(),
            vec!["ctrl+c", "alt+tab", "f5"]
        );
    }

    #[test]
    fn sequence_stops_at_first_failure() {
        let poster = Arc::new(RecordingPoster {
            fail_on: Some('x'),
            ..Default::default()
        });
        let rk = RelayKey::new_with_poster(poster.clone());
        let seq = KeySequence::parse("a, x, b").unwrap();
        assert_eq!(rk.send_sequence(&seq), Err(Error::Post("denied".into())));
        assert_eq!(*poster.chords.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn text_is_forwarded_verbatim() {
        let poster = Arc::new(RecordingPoster::default());
        let rk = RelayKey::new_with_poster(poster.clone());
        rk.type_text("hi\nthere").unwrap();
        assert_eq!(*poster.text.lock().unwrap(), "hi\nthere");
        assert_eq!(rk.type_text(""), Err(Error::Empty("text")));
    }

    #[test]
    fn mock_poster_accepts_everything() {
        let rk = RelayKey::new_with_mock_poster();
        assert!(rk.send_chord(&Chord::key(Key::Enter)).is_ok());
        assert!(rk.type_text("ok").is_ok());
    }
}
