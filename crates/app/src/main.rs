use anyhow::Result;
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod audio;
mod config;
mod control;

use audio::{SessionSettings, VoiceSession};
use config::AppConfig;
use control::Command;

#[derive(Parser)]
#[command(name = "stationvoice")]
#[command(about = "StationVoice: live station-announcer voice for your microphone", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available audio devices
    List,
    /// Start the voice effect (type 'stop' or press Ctrl+C to end)
    Run {
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
        /// Pitch ratio, 0.8 - 1.5
        #[arg(short, long)]
        pitch: Option<f32>,
        /// Start with the announcer chain off (pitch shift only)
        #[arg(long)]
        bypass: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::List) => {
            audio::list_devices()?;
        }
        Some(Commands::Run {
            input,
            output,
            pitch,
            bypass,
        }) => {
            run(input, output, pitch, bypass)?;
        }
        None => {
            run(None, None, None, false)?;
        }
    }

    Ok(())
}

fn run(
    input: Option<String>,
    output: Option<String>,
    pitch: Option<f32>,
    bypass: bool,
) -> Result<()> {
    let mut config = AppConfig::load();

    let settings = SessionSettings {
        input_device: AppConfig::resolve_device(input, &config.last_input),
        output_device: AppConfig::resolve_device(output, &config.last_output),
        pitch_ratio: pitch.unwrap_or(config.pitch_ratio),
        effects_enabled: config.effects_enabled && !bypass,
        ..SessionSettings::default()
    };

    let session = VoiceSession::start(&settings)?;
    println!(
        "StationVoice active: {} -> {}",
        session.input_name(),
        session.output_name()
    );
    print_status(&session);
    println!("Type 'help' for commands, 'stop' or Ctrl+C to end.");

    // Graceful shutdown handling
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("\nShutting down gracefully...");
        r.store(false, Ordering::Relaxed);
    })?;

    let commands = control::spawn_stdin_reader()?;
    let mut console_open = true;

    while running.load(Ordering::Relaxed) {
        if !console_open {
            std::thread::sleep(Duration::from_millis(100));
            continue;
        }
        match commands.recv_timeout(Duration::from_millis(100)) {
            Ok(Ok(Command::Stop)) => break,
            Ok(Ok(cmd)) => apply_command(&session, cmd),
            Ok(Err(e)) => println!("{}", e),
            Err(RecvTimeoutError::Timeout) => {}
            // stdin closed (e.g. running detached): keep going until Ctrl+C
            Err(RecvTimeoutError::Disconnected) => console_open = false,
        }
    }

    config.last_input = settings.input_device.clone();
    config.last_output = settings.output_device.clone();
    config.pitch_ratio = session.pitch_ratio();
    config.effects_enabled = session.effects_enabled();
    session.stop();
    config.save();

    println!("StationVoice stopped.");
    Ok(())
}

fn apply_command(session: &VoiceSession, cmd: Command) {
    match cmd {
        Command::Apply => {
            session.set_effects_enabled(true);
            println!("Announcer chain applied");
        }
        Command::Bypass => {
            session.set_effects_enabled(false);
            println!("Announcer chain bypassed (pitch shift only)");
        }
        Command::Pitch(ratio) => {
            let used = session.set_pitch_ratio(ratio);
            println!("Pitch ratio {:.2}", used);
        }
        Command::Nudge(step) => {
            let used = session.set_pitch_ratio(session.pitch_ratio() + step);
            println!("Pitch ratio {:.2}", used);
        }
        Command::Status => print_status(session),
        Command::Help => println!("{}", control::HELP),
        Command::Stop => {}
    }
}

fn print_status(session: &VoiceSession) {
    println!(
        "Pitch ratio {:.2} | chain {} | output level {:.3}",
        session.pitch_ratio(),
        if session.effects_enabled() { "on" } else { "off" },
        session.output_level()
    );
}
