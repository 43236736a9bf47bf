use almanac::{Activity, ActivityEffect, Firing};
use log::{debug, info, warn};
use tokio::process::Command;

/// Shows notifications on stdout and runs the programs an activity asks
/// for. Children are reaped on their own tasks.
#[derive(Debug, Clone, Default)]
pub struct ProcessEffect {
    sound_player: Option<String>,
}

impl ProcessEffect {
    pub fn new(sound_player: Option<String>) -> Self {
        Self { sound_player }
    }

    fn commands(&self, activity: &Activity) -> Vec<Command> {
        let mut commands = Vec::new();

        if let Some(sound) = &activity.sound {
            match &self.sound_player {
                Some(player) => {
                    let mut command = Command::new(player);
                    command.arg(sound);
                    commands.push(command);
                }
                None => debug!("No sound player configured, not playing {sound}"),
            }
        }

        if let Some(program) = &activity.program {
            let mut command = Command::new(&program.path);
            command.args(&program.args);
            commands.push(command);
        }

        commands
    }
}

impl ActivityEffect for ProcessEffect {
    fn fire(&self, firing: Firing) {
        let label = match &firing.category {
            Some(category) => format!("[{}] {}", category.name, firing.name),
            None => firing.name.clone(),
        };

        match &firing.activity.notification {
            Some(text) => println!("{label}: {text}"),
            None => println!("{label} ({})", firing.channel),
        }

        for mut command in self.commands(&firing.activity) {
            let program = command.as_std().get_program().to_string_lossy().into_owned();
            match command.spawn() {
                Ok(mut child) => {
                    tokio::spawn(async move {
                        match child.wait().await {
                            Ok(status) if status.success() => debug!("`{program}` finished"),
                            Ok(status) => warn!("`{program}` exited with {status}"),
                            Err(err) => warn!("Failed to wait for `{program}`: {err}"),
                        }
                    });
                }
                Err(err) => warn!("Failed to start `{program}` for {}: {err}", firing.record),
            }
        }

        info!("Handled {} of {}", firing.channel, firing.record);
    }
}
