//! Headless stagecast display host.
//!
//! Bridges a controller speaking JSON lines over stdio to the display engine.

pub mod cli;
mod surface;

pub use surface::{HeadlessSurface, SimulatedEmbedHost, SimulatedPlayer};

use std::io::{self, BufRead, Write};
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stagecast_engine::{create_engine, EngineConfig};
use stagecast_ipc::{
    command_channel, decode_command, encode_event, event_channel, DisplayCommand, DisplayEvent,
};

use crate::cli::Args;

/// Initialize logging. Logs go to stderr; stdout carries events.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "stagecast=debug,stagecast_lib=debug,stagecast_engine=debug,stagecast_ipc=info".into()
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Run the host until stdin closes or a shutdown command arrives.
pub fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    info!(?config, "Stagecast display starting");

    // Create IPC channels
    let (command_tx, command_rx) = command_channel();
    let (event_tx, event_rx) = event_channel();

    let loopback = (!args.manual_signals).then(|| command_tx.clone());

    thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || read_commands(io::stdin().lock(), command_tx))
        .context("Failed to spawn stdin reader")?;

    let writer = thread::Builder::new()
        .name("stdout-writer".into())
        .spawn(move || write_events(io::stdout().lock(), event_rx))
        .context("Failed to spawn stdout writer")?;

    let mut engine = create_engine(command_rx, event_tx, HeadlessSurface::new(loopback), config);
    let selection = engine.selection_handle();
    engine.run();
    drop(engine);

    match writer.join() {
        Ok(result) => result?,
        Err(_) => warn!("Event writer panicked"),
    }

    info!(base = selection.read().base.name(), "Stagecast display stopped");
    Ok(())
}

/// Decode one command per line. Malformed lines are logged and skipped.
fn read_commands(input: impl BufRead, command_tx: Sender<DisplayCommand>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match decode_command(line) {
            Ok(command) => {
                debug!(command = command.name(), "Command received");
                if command_tx.send(command).is_err() {
                    return;
                }
            }
            Err(e) => warn!("Ignoring malformed command: {}", e),
        }
    }

    info!("Input closed, shutting down");
    let _ = command_tx.send(DisplayCommand::Shutdown);
}

/// Encode one event per line until the engine shuts down.
fn write_events(mut output: impl Write, event_rx: Receiver<DisplayEvent>) -> Result<()> {
    for event in event_rx {
        let line = encode_event(&event).context("Failed to encode event")?;
        writeln!(output, "{line}").context("Failed to write event")?;
        output.flush().context("Failed to flush events")?;

        if event == DisplayEvent::Shutdown {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecast_ipc::{QueryRequest, SlideContent};

    #[test]
    fn test_read_commands_skips_malformed_lines() {
        let (tx, rx) = command_channel();
        let input = "{\"slideUpdate\":{\"content\":{\"type\":\"blank\"}}}\nnot json\n\n\"shutdown\"\n";
        read_commands(input.as_bytes(), tx);

        let commands: Vec<_> = rx.try_iter().collect();
        assert_eq!(commands.len(), 3);
        match &commands[0] {
            DisplayCommand::SlideUpdate(update) => {
                assert_eq!(update.content, SlideContent::Blank)
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(commands[1], DisplayCommand::Shutdown);
        assert_eq!(commands[2], DisplayCommand::Shutdown);
    }

    #[test]
    fn test_write_events_stops_after_shutdown() {
        let (tx, rx) = event_channel();
        tx.send(DisplayEvent::Query {
            id: 1,
            request: QueryRequest::VideoReady,
        })
        .unwrap();
        tx.send(DisplayEvent::Shutdown).unwrap();
        tx.send(DisplayEvent::Ready).unwrap();

        let mut output = Vec::new();
        write_events(&mut output, rx).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![r#"{"query":{"id":1,"request":"videoReady"}}"#, r#""shutdown""#]
        );
    }
}
