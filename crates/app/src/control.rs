//! Line-oriented control console for a running session.
//!
//! Commands are read on a background thread and handed to the main loop over
//! a channel, so the audio path never waits on stdin.

use anyhow::{anyhow, bail, Result};
use crossbeam_channel::{Receiver, Sender};
use std::io::BufRead;
use std::str::FromStr;
use std::thread;

/// Ratio change for `up` / `down`.
pub const PITCH_STEP: f32 = 0.02;

pub const HELP: &str = "\
Commands:
  apply          switch the announcer chain on
  bypass         pitch shift only
  pitch <ratio>  set pitch ratio (0.8 - 1.5)
  up | down      nudge pitch by 0.02
  status         show current settings
  stop           end the session";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Apply,
    Bypass,
    Pitch(f32),
    Nudge(f32),
    Status,
    Help,
    Stop,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else {
            bail!("empty command");
        };

        let cmd = match word.to_ascii_lowercase().as_str() {
            "apply" | "on" => Command::Apply,
            "bypass" | "off" => Command::Bypass,
            "pitch" | "p" => {
                let value = parts
                    .next()
                    .ok_or_else(|| anyhow!("pitch needs a ratio, e.g. 'pitch 1.12'"))?;
                let ratio: f32 = value
                    .parse()
                    .map_err(|_| anyhow!("'{}' is not a number", value))?;
                if !ratio.is_finite() {
                    bail!("'{}' is not a usable ratio", value);
                }
                Command::Pitch(ratio)
            }
            "up" | "+" => Command::Nudge(PITCH_STEP),
            "down" | "-" => Command::Nudge(-PITCH_STEP),
            "status" | "s" => Command::Status,
            "help" | "?" => Command::Help,
            "stop" | "quit" | "q" | "exit" => Command::Stop,
            other => bail!("unknown command '{}' (try 'help')", other),
        };

        if let Some(extra) = parts.next() {
            bail!("unexpected argument '{}'", extra);
        }
        Ok(cmd)
    }
}

/// Spawns the stdin reader. The channel closes when stdin does.
pub fn spawn_stdin_reader() -> Result<Receiver<Result<Command>>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("stationvoice-console".into())
        .spawn(move || read_commands(std::io::stdin().lock(), &tx))?;
    Ok(rx)
}

fn read_commands(reader: impl BufRead, tx: &Sender<Result<Command>>) {
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        if tx.send(line.parse()).is_err() {
            break;
        }
    }
}
