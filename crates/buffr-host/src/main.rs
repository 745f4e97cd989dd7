//! Buffr host - headless live looper
//!
//! This is the main entry point. It:
//! 1. Starts the duplex audio system (the engine lives in the output callback)
//! 2. Applies configured parameters and restores saved state
//! 3. Bridges hardware MIDI and stdin line commands to the engine
//!
//! ## Command line flags
//!
//! - `--config <path>`: Use a config file other than ~/.config/buffr/host.yaml
//! - `--list-devices`: Print audio devices and MIDI input ports, then exit

mod config;
mod control;
mod session;

use std::io::BufRead;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use buffr_core::audio::{self, AudioSystemResult, Direction};
use buffr_core::config::{default_config_path, load_config};
use buffr_midi::{MidiConnection, MidiInputEvent, MidiInputHandler};

use config::{HostConfig, HOST_CONFIG_FILE};
use control::{ControlCommand, HELP};
use session::Session;

/// Capacity of the hardware MIDI → host channel
const MIDI_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    list_devices: bool,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--list-devices" => parsed.list_devices = true,
                other => bail!("Unknown argument: {} (expected --config <path> or --list-devices)", other),
            }
        }
        Ok(parsed)
    }
}

enum HostEvent {
    Midi(MidiInputEvent),
    Line(String),
    InputClosed,
    StatusTick,
}

fn main() -> Result<()> {
    let args = Args::parse(std::env::args().skip(1))?;

    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if args.list_devices {
        list_devices();
        return Ok(());
    }

    log::info!("buffr-host starting up");

    let config_path = args
        .config
        .unwrap_or_else(|| default_config_path(HOST_CONFIG_FILE));
    let config: HostConfig = load_config(&config_path);

    let AudioSystemResult {
        handle,
        controller,
        sample_rate,
        buffer_size,
        latency_ms,
    } = audio::start_audio_system(&config.audio).context("Failed to start audio")?;
    log::info!(
        "Audio running: {} -> {}, {} Hz, {} frames (~{:.1} ms)",
        handle.input_name(),
        handle.output_name(),
        sample_rate,
        buffer_size,
        latency_ms
    );

    let mut session = Session::new(controller, config.state_path.clone());
    session.apply_params(&config.params);

    if let Some(path) = config.state_path.as_deref().filter(|p| p.exists()) {
        match session.restore(Some(path)) {
            Ok(path) => log::info!("Restored state from {:?}", path),
            Err(e) => log::warn!("Could not restore state: {:#}", e),
        }
    }

    let (midi_tx, midi_rx) = flume::bounded(MIDI_CHANNEL_CAPACITY);
    let _midi_input = config.midi_port.as_deref().and_then(|pattern| {
        match MidiInputHandler::connect(pattern, midi_tx.clone()) {
            Ok(handler) => Some(handler),
            Err(e) => {
                log::warn!("MIDI: {} - continuing without hardware MIDI", e);
                None
            }
        }
    });

    let (line_tx, line_rx) = flume::unbounded();
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn stdin reader")?;

    println!("buffr ready - type 'help' for commands");

    let status_interval =
        (config.status_interval_ms > 0).then(|| Duration::from_millis(config.status_interval_ms));
    let mut next_status = status_interval.map(|interval| Instant::now() + interval);

    loop {
        let selector = flume::Selector::new()
            .recv(&midi_rx, |event| match event {
                Ok(event) => HostEvent::Midi(event),
                // Never disconnects while main holds midi_tx
                Err(_) => HostEvent::StatusTick,
            })
            .recv(&line_rx, |line| match line {
                Ok(line) => HostEvent::Line(line),
                Err(_) => HostEvent::InputClosed,
            });

        let event = match next_status {
            Some(due) => selector
                .wait_timeout(due.saturating_duration_since(Instant::now()))
                .unwrap_or(HostEvent::StatusTick),
            None => selector.wait(),
        };

        match event {
            HostEvent::Midi(event) => {
                if let Err(e) = session.handle_midi(event) {
                    log::warn!("MIDI: {}", e);
                }
            }
            HostEvent::Line(line) => match ControlCommand::parse(&line) {
                Ok(None) => {}
                Ok(Some(ControlCommand::Quit)) => break,
                Ok(Some(command)) => match session.execute(&command) {
                    Ok(reply) if reply.is_empty() => {}
                    Ok(reply) => println!("{}", reply),
                    Err(e) => println!("error: {:#}", e),
                },
                Err(e) => println!("error: {}", e),
            },
            HostEvent::InputClosed => {
                log::info!("stdin closed");
                break;
            }
            HostEvent::StatusTick => {}
        }

        if let (Some(due), Some(interval)) = (next_status, status_interval) {
            if Instant::now() >= due {
                log::info!("{}", session.status_line());
                next_status = Some(due + interval);
            }
        }
    }

    if config.state_path.is_some() {
        match session.save(None) {
            Ok(path) => log::info!("Saved state to {:?}", path),
            Err(e) => log::error!("Failed to save state: {:#}", e),
        }
    }

    drop(handle);
    log::info!("buffr-host stopped");
    Ok(())
}

fn list_devices() {
    for direction in [Direction::Input, Direction::Output] {
        println!("Audio {} devices:", direction);
        match audio::get_devices(direction) {
            Ok(devices) => {
                for device in devices {
                    println!(
                        "  {} ({} ch, rates {:?})",
                        device, device.max_channels, device.sample_rates
                    );
                }
            }
            Err(e) => println!("  none ({})", e),
        }
    }

    println!("MIDI input ports:");
    match MidiConnection::list_input_ports() {
        Ok(ports) if ports.is_empty() => println!("  none"),
        Ok(ports) => ports.iter().for_each(|port| println!("  {}", port)),
        Err(e) => println!("  unavailable ({})", e),
    }

    println!();
    println!("{}", HELP);
}
