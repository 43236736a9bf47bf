use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use almanac::{ActivityWindow, Channel, RecordRef, SnoozePrompt};
use anyhow::{anyhow, bail, Result};
use log::{info, warn};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Snooze {
        record: RecordRef,
        channel: Channel,
        delay: Option<(u32, u32)>,
    },
    Dismiss {
        record: RecordRef,
        channel: Channel,
    },
    List,
}

fn parse_command(line: &str) -> Result<Command> {
    let mut words = line.split_whitespace();
    let verb = words.next().ok_or_else(|| anyhow!("empty command"))?;

    if verb == "list" {
        return Ok(Command::List);
    }

    let record = words
        .next()
        .ok_or_else(|| anyhow!("missing record id"))?
        .trim_start_matches('#')
        .parse::<u64>()
        .map(RecordRef)?;

    let channel = match words.next() {
        Some("event") | None => Channel::Event,
        Some("reminder") => Channel::Reminder,
        Some(other) => bail!("unknown channel `{other}`, expected `event` or `reminder`"),
    };

    match verb {
        "snooze" => {
            let delay = match (words.next(), words.next()) {
                (None, _) => None,
                (Some(hours), minutes) => Some((hours.parse()?, minutes.unwrap_or("0").parse()?)),
            };
            Ok(Command::Snooze {
                record,
                channel,
                delay,
            })
        }
        "dismiss" => Ok(Command::Dismiss { record, channel }),
        other => bail!("unknown command `{other}`"),
    }
}

/// Terminal activity window: prompts go to stdout, answers come from
/// stdin as `snooze <id> [event|reminder] [hours [minutes]]`,
/// `dismiss <id> [event|reminder]` or `list`.
#[derive(Debug, Clone, Default)]
pub struct StdinWindow {
    pending: Arc<Mutex<BTreeMap<(RecordRef, bool), SnoozePrompt>>>,
}

impl StdinWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles one line of user input and returns the text to show.
    pub fn handle(&self, line: &str) -> Result<String> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        match parse_command(line)? {
            Command::List => Ok(pending
                .values()
                .map(|prompt| format!("{} {}", prompt.record, prompt.message))
                .collect::<Vec<_>>()
                .join("\n")),

            Command::Dismiss { record, channel } => pending
                .remove(&(record, channel.is_reminder()))
                .map(|_| format!("Dismissed {channel} of {record}"))
                .ok_or_else(|| anyhow!("nothing pending for {channel} of {record}")),

            Command::Snooze {
                record,
                channel,
                delay,
            } => {
                let prompt = pending
                    .remove(&(record, channel.is_reminder()))
                    .ok_or_else(|| anyhow!("nothing pending for {channel} of {record}"))?;

                let (hours, minutes) = delay.unwrap_or(prompt.default_delay);
                if !prompt.snooze(hours, minutes) {
                    bail!("scheduler is not running");
                }
                Ok(format!("Snoozed {channel} of {record} for {hours}h {minutes}m"))
            }
        }
    }

    pub fn spawn_reader(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut lines = BufReader::new(io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match self.handle(&line) {
                        Ok(reply) => println!("{reply}"),
                        Err(err) => eprintln!("{err}"),
                    },
                    Ok(None) => {
                        info!("Standard input closed, no more snooze commands");
                        break;
                    }
                    Err(err) => {
                        warn!("Failed to read standard input: {err}");
                        break;
                    }
                }
            }
        })
    }
}

impl ActivityWindow for StdinWindow {
    fn present(&self, prompt: SnoozePrompt) {
        let channel = Channel::from_is_reminder(prompt.is_reminder);
        let (hours, minutes) = prompt.default_delay;
        println!(
            "{}: {} [snooze {} {channel} {hours} {minutes}]",
            prompt.title, prompt.message, prompt.record.0
        );

        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((prompt.record, prompt.is_reminder), prompt);
    }
}
