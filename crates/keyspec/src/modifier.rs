use std::fmt;

/// Modifier keys, in canonical press order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    /// Control.
    Control,
    /// Alt/Option.
    Alt,
    /// Shift.
    Shift,
    /// Command on macOS, the Windows/Super key elsewhere.
    Meta,
}

impl Modifier {
    /// Parses a modifier spec, accepting common alias words
    /// (ctrl, opt/option, cmd/command/win/super).
    pub fn from_spec(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ctrl" | "control" => Some(Self::Control),
            "alt" | "opt" | "option" => Some(Self::Alt),
            "shift" => Some(Self::Shift),
            "cmd" | "command" | "meta" | "win" | "super" => Some(Self::Meta),
            _ => None,
        }
    }

    /// Canonical spec string.
    pub fn to_spec(self) -> &'static str {
        match self {
            Self::Control => "ctrl",
            Self::Alt => "alt",
            Self::Shift => "shift",
            Self::Meta => "cmd",
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_spec())
    }
}
