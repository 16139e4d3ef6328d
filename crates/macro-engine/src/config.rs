//! Engine tunables.
use std::{env, path::PathBuf, time::Duration};

use midi_input::DEFAULT_RELEASE_VELOCITY;

/// Minimum interval between accepted executions of the same trigger.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Environment variable enabling the audit trail.
pub const DEBUG_ENV: &str = "MIDIMACROS_DEBUG";

/// File name of the audit trail inside the state directory.
pub const AUDIT_FILE: &str = "debug.log";

/// Engine configuration. Defaults live here; the binary overrides from flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Per-identity debounce window.
    pub debounce: Duration,
    /// Note velocity that qualifies a trigger.
    pub release_velocity: u8,
    /// Write the audit trail.
    pub audit: bool,
    /// Directory holding the audit trail.
    pub state_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            release_velocity: DEFAULT_RELEASE_VELOCITY,
            audit: false,
            state_dir: macro_registry::default_state_dir(),
        }
    }
}

impl EngineConfig {
    /// Defaults with the audit toggle taken from the environment.
    pub fn from_env() -> Self {
        Self {
            audit: audit_env_enabled(env::var(DEBUG_ENV).ok().as_deref()),
            ..Self::default()
        }
    }

    /// Path of the audit trail.
    pub fn audit_path(&self) -> PathBuf {
        self.state_dir.join(AUDIT_FILE)
    }
}

/// Interpret the value of the audit environment toggle.
fn audit_env_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.debounce, Duration::from_millis(500));
        assert_eq!(c.release_velocity, 0);
        assert!(!c.audit);
        assert!(c.audit_path().ends_with(".midimacros/debug.log"));
    }

    #[test]
    fn env_toggle_is_case_insensitive_true_only() {
        assert!(audit_env_enabled(Some("true")));
        assert!(audit_env_enabled(Some("TRUE")));
        assert!(!audit_env_enabled(Some("1")));
        assert!(!audit_env_enabled(Some("")));
        assert!(!audit_env_enabled(None));
    }
}
