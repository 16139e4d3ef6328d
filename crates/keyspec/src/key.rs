use std::fmt;

/// A non-modifier key.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// A printable character, lowercased for ASCII letters.
    Char(char),
    /// Function key F1..=F20.
    F(u8),
    /// Space bar.
    Space,
    /// Return/Enter.
    Enter,
    /// Escape.
    Escape,
    /// Tab.
    Tab,
    /// Backspace.
    Backspace,
    /// Forward delete.
    Delete,
    /// Arrow up.
    Up,
    /// Arrow down.
    Down,
    /// Arrow left.
    Left,
    /// Arrow right.
    Right,
    /// Home.
    Home,
    /// End.
    End,
    /// Page up.
    PageUp,
    /// Page down.
    PageDown,
}

impl Key {
    /// Parses a key spec, case-insensitively.
    ///
    /// Accepts single characters (a literal `" "` is Space), `f1`..`f20`, and
    /// the named keys with their common aliases (return, esc, del, pgup, ...).
    pub fn from_spec(s: &str) -> Option<Self> {
        if s == " " {
            return Some(Self::Space);
        }
        let s = s.trim();
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(Self::Char(c.to_ascii_lowercase()));
        }
        let lower = s.to_ascii_lowercase();
        let named = match lower.as_str() {
            "space" | "spacebar" => Self::Space,
            "enter" | "return" => Self::Enter,
            "esc" | "escape" => Self::Escape,
            "tab" => Self::Tab,
            "backspace" => Self::Backspace,
            "delete" | "del" => Self::Delete,
            "up" | "uparrow" => Self::Up,
            "down" | "downarrow" => Self::Down,
            "left" | "leftarrow" => Self::Left,
            "right" | "rightarrow" => Self::Right,
            "home" => Self::Home,
            "end" => Self::End,
            "pageup" | "pgup" => Self::PageUp,
            "pagedown" | "pgdn" => Self::PageDown,
            "comma" => Self::Char(','),
            "plus" => Self::Char('+'),
            other => {
                let n: u8 = other.strip_prefix('f')?.parse().ok()?;
                if !(1..=20).contains(&n) {
                    return None;
                }
                Self::F(n)
            }
        };
        Some(named)
    }

    /// Canonical lowercase spec string.
    pub fn to_spec(self) -> String {
        match self {
            // Separators of the sequence/chord grammar render as names.
            Self::Char(',') => "comma".into(),
            Self::Char('+') => "plus".into(),
            Self::Char(c) => c.to_string(),
            Self::F(n) => format!("f{n}"),
            Self::Space => "space".into(),
            Self::Enter => "enter".into(),
            Self::Escape => "esc".into(),
            Self::Tab => "tab".into(),
            Self::Backspace => "backspace".into(),
            Self::Delete => "delete".into(),
            Self::Up => "up".into(),
            Self::Down => "down".into(),
            Self::Left => "left".into(),
            Self::Right => "right".into(),
            Self::Home => "home".into(),
            Self::End => "end".into(),
            Self::PageUp => "pageup".into(),
            Self::PageDown => "pagedown".into(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_spec())
    }
}
