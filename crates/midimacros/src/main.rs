//! Binary entrypoint for midimacros.
use std::{process, sync::Arc};

use clap::Parser;
use macro_engine::{Engine, RelayExecutor};
use macro_protocol::{
    MsgToUI,
    ipc::{UiRx, ui_channel},
};
use macro_registry::JsonFileStore;
use midi_input::MidirTransport;
use tracing::{debug, error};

/// Command-line definitions.
mod cli;
/// Stdin control surface for `run`.
mod control;
/// Console rendering.
mod display;
/// Front-end errors.
mod error;

use crate::{
    cli::{Cli, Command},
    error::Result,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log);
    if let Err(e) = run(cli).await {
        error!(error = %e, "midimacros_failed");
        eprintln!("{e}");
        process::exit(1);
    }
}

/// Execute the selected subcommand.
async fn run(cli: Cli) -> Result<()> {
    let config = cli.engine_config();
    debug!(state_dir = %config.state_dir.display(), audit = config.audit, "starting");
    let store = Arc::new(JsonFileStore::in_dir(&config.state_dir));
    let (tx, mut rx) = ui_channel();
    let engine = Engine::new(
        config,
        Arc::new(MidirTransport::default()),
        store,
        Arc::new(RelayExecutor::default()),
        tx,
    );

    match cli.command {
        Command::Run { port, live } => return control::run(engine, rx, port, live).await,
        Command::Ports => print!("{}", display::port_list(&engine.ports().await?)),
        Command::List => print!("{}", display::macro_table(&engine.macros())),
        Command::Bind {
            identity,
            keys,
            text,
            name,
        } => {
            let action = cli::bind_action(keys, text)?;
            let summary = action.summary();
            engine.bind(identity, name, action)?;
            println!("bound {identity}: {summary}");
        }
        Command::Rename { identity, name } => engine.rename(&identity, name)?,
        Command::Remove { identity } => {
            let removed = engine.remove(&identity)?;
            println!("removed {}", removed.name);
        }
    }
    flush_notifications(&mut rx);
    Ok(())
}

/// Print notifications queued by one-shot commands, such as a failed
/// restore.
fn flush_notifications(rx: &mut UiRx) {
    while let Ok(msg) = rx.try_recv() {
        if let MsgToUI::Notify { .. } = msg
            && let Some(line) = display::render(&msg)
        {
            eprintln!("{line}");
        }
    }
}
