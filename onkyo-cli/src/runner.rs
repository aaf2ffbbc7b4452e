//! The `run` loop: feeds socket events, ticks and stdin commands to the engine.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use onkyo_engine::{Engine, EngineConfig};
use tracing::{debug, info, warn};

use crate::commands::CommandLine;
use crate::host::ConsoleHost;
use crate::network::{NetEvent, StdNetwork};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

type ConsoleEngine = Engine<ConsoleHost, StdNetwork>;

/// Drive an engine until Ctrl-C or `quit`.
pub fn run(config: EngineConfig, host: ConsoleHost) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .context("Failed to install Ctrl-C handler")?;
    }

    let mut engine = Engine::new(config, host, StdNetwork::new())
        .context("Invalid engine configuration")?;
    let mut input = Some(spawn_stdin_reader());

    println!("Type '<unit> <On|Off|Set Level> [level]', 'status' or 'quit'. Ctrl-C stops.");
    engine.on_start();

    let mut next_tick = Instant::now();
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();

        for event in engine.network_mut().poll(now) {
            dispatch(&mut engine, event);
        }

        if now >= next_tick {
            engine.on_tick();
            // A connect during the tick is reported on the next poll
            let interval = engine
                .host()
                .heartbeat()
                .unwrap_or(engine.config().startup_tick_interval);
            next_tick = now + interval;
        }

        if let Some(line) = next_input(&mut input) {
            if !handle_input(&mut engine, &line) {
                break;
            }
        }

        thread::sleep(POLL_INTERVAL);
    }

    info!("Shutting down");
    engine.on_stop();
    Ok(())
}

/// Next stdin line, if one is waiting.
///
/// A closed stdin (e.g. `/dev/null` under a service manager) only stops
/// command intake; the session keeps running.
fn next_input(input: &mut Option<Receiver<String>>) -> Option<String> {
    match input.as_ref()?.try_recv() {
        Ok(line) => Some(line),
        Err(TryRecvError::Empty) => None,
        Err(TryRecvError::Disconnected) => {
            debug!("Input closed, commands disabled");
            *input = None;
            None
        }
    }
}

fn dispatch(engine: &mut ConsoleEngine, event: NetEvent) {
    match event {
        NetEvent::Connected => engine.on_connected(),
        NetEvent::Data(bytes) => engine.on_message(&bytes),
        NetEvent::Disconnected => engine.on_disconnected(),
    }
}

/// Returns `false` when the user asked to quit.
fn handle_input(engine: &mut ConsoleEngine, line: &str) -> bool {
    match line.trim() {
        "" => true,
        "quit" | "exit" => false,
        "status" => {
            println!("Session: {}", engine.state());
            if let Some(receiver) = engine.receiver() {
                println!("Receiver: {} at {}", receiver.model, receiver.control_addr());
            }
            for line in engine.host().summary() {
                println!("{}", line);
            }
            true
        }
        text => {
            let result = CommandLine::parse(text).and_then(|cmd| {
                engine
                    .on_command(cmd.unit, &cmd.command, cmd.level)
                    .map_err(anyhow::Error::from)
            });
            if let Err(e) = result {
                warn!(input = text, error = %e, "Command rejected");
                println!("! {}", e);
            }
            true
        }
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
