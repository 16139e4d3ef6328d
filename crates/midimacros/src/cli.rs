//! Command-line definitions.
use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use macro_engine::EngineConfig;
use macro_registry::Action;
use midi_input::TriggerIdentity;

use crate::error::{Error, Result};

#[derive(Parser, Debug)]
#[command(
    name = "midimacros",
    about = "Trigger keyboard macros from a MIDI controller",
    version
)]
/// Command-line interface for the `midimacros` binary.
pub struct Cli {
    /// What to do.
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding macros.json and the audit trail
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Velocity that marks a note message as the qualifying release
    #[arg(long, value_name = "VEL")]
    pub release_velocity: Option<u8>,

    /// Debounce window per trigger, in milliseconds
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Write the audit trail (also enabled by MIDIMACROS_DEBUG=true)
    #[arg(long)]
    pub audit: bool,

    /// Logging controls
    #[command(flatten)]
    pub log: logging::LogArgs,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
pub enum Command {
    /// List available MIDI input ports.
    Ports,
    /// List stored macros.
    List,
    /// Bind a trigger such as `note_on:0:60` to an action.
    Bind {
        /// Trigger identity, `<kind>:<channel>:<number>`
        identity: TriggerIdentity,

        /// Key sequence to send, e.g. "cmd+shift+4" or "ctrl+c, ctrl+v"
        #[arg(long, conflicts_with = "text", required_unless_present = "text")]
        keys: Option<String>,

        /// Text to type
        #[arg(long)]
        text: Option<String>,

        /// Display name (defaults to the trigger label)
        #[arg(long)]
        name: Option<String>,
    },
    /// Rename a stored macro.
    Rename {
        /// Trigger identity
        identity: TriggerIdentity,
        /// New display name
        name: String,
    },
    /// Remove a stored macro.
    Remove {
        /// Trigger identity
        identity: TriggerIdentity,
    },
    /// Listen to a device and run macros, reading commands from stdin.
    Run {
        /// Port to connect at startup
        #[arg(long)]
        port: Option<String>,

        /// Start in live mode instead of test mode
        #[arg(long)]
        live: bool,
    },
}

impl Cli {
    /// Engine configuration: environment defaults with flag overrides.
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::from_env();
        if let Some(dir) = &self.state_dir {
            config.state_dir = dir.clone();
        }
        if let Some(vel) = self.release_velocity {
            config.release_velocity = vel;
        }
        if let Some(ms) = self.debounce_ms {
            config.debounce = Duration::from_millis(ms);
        }
        config.audit |= self.audit;
        config
    }
}

/// Build the action for `bind` from its mutually exclusive flags.
pub fn bind_action(keys: Option<String>, text: Option<String>) -> Result<Action> {
    match (keys, text) {
        (Some(keys), None) => Ok(Action::send_keys(&keys)?),
        (None, Some(text)) => Ok(Action::write_text(text)?),
        _ => Err(Error::Usage("exactly one of --keys or --text is required".into())),
    }
}
