//! Line-oriented control surface for `midimacros run`.
//!
//! Each stdin line is parsed into an [`Intent`] and applied to the engine;
//! engine messages are printed as they arrive.
use std::{result, str::FromStr};

use macro_engine::Engine;
use macro_protocol::{Mode, ipc::UiRx};
use macro_registry::Action;
use midi_input::TriggerIdentity;
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    signal,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{display, error::Result};

/// Help text printed at startup and on `help`.
pub const HELP: &str = "\
commands:
  live | test                 switch execution mode
  status                      show connection, mode and macro count
  list                        list macros
  ports                       list input ports
  connect <port>              open a port
  disconnect                  close the open port
  learn keys <sequence>       bind the next trigger to a key sequence
  learn text <text>           bind the next trigger to typed text
                              (\"...\" keeps edge spaces and \n escapes)
  set <identity> keys|text .. replace a macro's action
  rename <identity> <name>    rename a macro
  remove <identity>           remove a macro
  quit";

/// One parsed control line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Execute bound actions.
    Live,
    /// Report triggers without executing.
    Test,
    /// Print engine state.
    Status,
    /// List macros.
    List,
    /// List input ports.
    Ports,
    /// Open a port.
    Connect(String),
    /// Close the open port.
    Disconnect,
    /// Bind the next trigger to an action.
    Learn(Action),
    /// Replace the action of a macro.
    SetAction {
        /// Macro to change.
        identity: TriggerIdentity,
        /// New action.
        action: Action,
    },
    /// Rename a macro.
    Rename {
        /// Macro to rename.
        identity: TriggerIdentity,
        /// New display name.
        name: String,
    },
    /// Remove a macro.
    Remove(TriggerIdentity),
    /// Print help.
    Help,
    /// Leave the control loop.
    Quit,
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(line: &str) -> result::Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = split_word(line);
        let intent = match word.to_ascii_lowercase().as_str() {
            "live" => Self::Live,
            "test" => Self::Test,
            "status" => Self::Status,
            "list" | "ls" => Self::List,
            "ports" => Self::Ports,
            "disconnect" => Self::Disconnect,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            "connect" if !rest.is_empty() => Self::Connect(rest.to_string()),
            "learn" => Self::Learn(
                parse_action(rest).ok_or("usage: learn keys <sequence> | learn text <text>")??,
            ),
            "set" => {
                let (id, rest) = split_word(rest);
                let action = parse_action(rest)
                    .ok_or("usage: set <identity> keys <sequence> | set <identity> text <text>")??;
                Self::SetAction {
                    identity: parse_identity(id)?,
                    action,
                }
            }
            "rename" => {
                let (id, name) = split_word(rest);
                if name.is_empty() {
                    return Err("usage: rename <identity> <name>".into());
                }
                Self::Rename {
                    identity: parse_identity(id)?,
                    name: name.to_string(),
                }
            }
            "remove" | "rm" => Self::Remove(parse_identity(rest)?),
            "connect" => return Err("usage: connect <port>".into()),
            "" => return Err("empty command".into()),
            other => return Err(format!("unknown command: {other} (try help)")),
        };
        Ok(intent)
    }
}

/// Split off the first whitespace-delimited word; the remainder is trimmed.
fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (s, ""),
    }
}

/// Parse `keys <sequence>` or `text <text>`. `None` when the action kind is
/// missing or unknown.
fn parse_action(s: &str) -> Option<result::Result<Action, String>> {
    let (what, payload) = split_word(s);
    let action = match what {
        "keys" => Action::send_keys(payload).map_err(|e| e.to_string()),
        "text" => typed_text(payload)
            .and_then(|text| Action::write_text(text).map_err(|e| e.to_string())),
        _ => return None,
    };
    Some(action)
}

/// Text payload: taken as written, or a double-quoted string with JSON
/// escapes (`\n`, `\t`, `\"`) when it starts with a quote.
fn typed_text(payload: &str) -> result::Result<String, String> {
    if payload.starts_with('"') {
        serde_json::from_str(payload).map_err(|e| format!("invalid quoted text: {e}"))
    } else {
        Ok(payload.to_string())
    }
}

/// Parse a trigger identity, flattening the error for display.
fn parse_identity(s: &str) -> result::Result<TriggerIdentity, String> {
    s.parse().map_err(|e| format!("{e}"))
}

/// Run the engine and the control loop until `quit`, end of input or Ctrl-C.
pub async fn run(engine: Engine, mut rx: UiRx, port: Option<String>, live: bool) -> Result<()> {
    let cancel = CancellationToken::new();
    let dispatch = engine.start(cancel.clone())?;
    let printer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Some(line) = display::render(&msg) {
                println!("{line}");
            }
        }
    });

    if live {
        engine.set_mode(Mode::Live);
    }
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();
    if let Some(port) = port {
        tasks.extend(apply(&engine, Intent::Connect(port)));
    }
    println!("{HELP}");

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Intent>() {
                    Ok(Intent::Quit) => break,
                    Ok(intent) => {
                        tasks.retain(|t| !t.is_finished());
                        tasks.extend(apply(&engine, intent));
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
        }
    }

    info!("control_loop_exit");
    for task in &tasks {
        task.abort();
    }
    engine.disconnect().await?;
    cancel.cancel();
    if let Err(e) = dispatch.await {
        warn!(error = %e, "dispatch_loop_join_failed");
    }
    printer.abort();
    Ok(())
}

/// Apply one intent. Failures are printed; the loop keeps running.
///
/// Device intents and learn run as background tasks, returned so the caller
/// can stop them on exit; a slow port never holds up the next line.
fn apply(engine: &Engine, intent: Intent) -> Option<JoinHandle<()>> {
    debug!(?intent, "control_intent");
    let result = match intent {
        Intent::Live => {
            engine.set_mode(Mode::Live);
            Ok(())
        }
        Intent::Test => {
            engine.set_mode(Mode::Test);
            Ok(())
        }
        Intent::Status => {
            println!(
                "{}",
                display::status_line(&engine.status(), engine.mode(), engine.macros().len())
            );
            Ok(())
        }
        Intent::List => {
            print!("{}", display::macro_table(&engine.macros()));
            Ok(())
        }
        Intent::Ports => {
            let engine = engine.clone();
            return background("ports", async move {
                let ports = engine.ports().await?;
                print!("{}", display::port_list(&ports));
                Ok(())
            });
        }
        Intent::Connect(port) => {
            let engine = engine.clone();
            return background("connect", async move { engine.connect(&port).await });
        }
        Intent::Disconnect => {
            let engine = engine.clone();
            return background("disconnect", async move { engine.disconnect().await });
        }
        Intent::Learn(action) => {
            if engine.capture_pending() {
                println!("replacing pending learn");
            }
            println!("press a control to bind: {}", action.summary());
            let engine = engine.clone();
            return background("learn", async move {
                let identity = engine.capture_trigger().await?;
                engine.bind(identity, None, action)
            });
        }
        Intent::SetAction { identity, action } => engine.set_action(&identity, action),
        Intent::Rename { identity, name } => engine.rename(&identity, name),
        Intent::Remove(identity) => engine.remove(&identity).map(|m| {
            println!("removed {}", m.name);
        }),
        Intent::Help => {
            println!("{HELP}");
            Ok(())
        }
        Intent::Quit => Ok(()),
    };
    if let Err(e) = result {
        eprintln!("{e}");
    }
    None
}

/// Run `task` off the control loop, printing its error under `label`.
fn background<F>(label: &'static str, task: F) -> Option<JoinHandle<()>>
where
    F: Future<Output = macro_engine::Result<()>> + Send + 'static,
{
    Some(tokio::spawn(async move {
        if let Err(e) = task.await {
            eprintln!("{label}: {e}");
        }
    }))
}
