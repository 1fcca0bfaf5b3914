//! Line-based console controls for the headless peer
//!
//! ```text
//! left | a          hold the move-left key
//! right | d         hold the move-right key
//! stop              release movement
//! aim <x> <y>       move the pointer (field coordinates)
//! confirm | w       tap confirm (lock angle, then fire)
//! cancel | s        tap cancel (back to angle)
//! shell <kind>      light | heavy | explosive (or z / x / c)
//! ```

use std::io::BufRead;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::game::{InputCommand, InputFrame, InputSource, Key, ScriptedInput};
use crate::ws::protocol::MoveDirection;

/// Console parse errors
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

/// Parse one console line
pub fn parse_command(line: &str) -> Result<InputCommand, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandError::Empty);
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "left" | "a" => InputCommand::Hold(MoveDirection::Left),
        "right" | "d" => InputCommand::Hold(MoveDirection::Right),
        "stop" => InputCommand::Hold(MoveDirection::Stop),
        "confirm" | "w" => InputCommand::Tap(Key::Confirm),
        "cancel" | "s" => InputCommand::Tap(Key::Cancel),
        "z" => InputCommand::Tap(Key::ShellLight),
        "x" => InputCommand::Tap(Key::ShellHeavy),
        "c" => InputCommand::Tap(Key::ShellExplosive),
        "aim" => {
            const USAGE: &str = "aim <x> <y>";
            let x = words.next().and_then(|w| w.parse().ok());
            let y = words.next().and_then(|w| w.parse().ok());
            match (x, y) {
                (Some(x), Some(y)) => InputCommand::Aim { x, y },
                _ => return Err(CommandError::Usage(USAGE)),
            }
        }
        "shell" => {
            const USAGE: &str = "shell light|heavy|explosive";
            let key = match words.next().map(str::to_ascii_lowercase).as_deref() {
                Some("light") => Key::ShellLight,
                Some("heavy") => Key::ShellHeavy,
                Some("explosive") => Key::ShellExplosive,
                _ => return Err(CommandError::Usage(USAGE)),
            };
            InputCommand::Tap(key)
        }
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(command)
}

/// Input source shared between the console reader and the game loop
#[derive(Clone, Default)]
pub struct SharedInput {
    inner: Arc<Mutex<ScriptedInput>>,
}

impl SharedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: InputCommand) {
        self.inner.lock().push(command);
    }
}

impl InputSource for SharedInput {
    fn sample(&mut self) -> InputFrame {
        self.inner.lock().sample()
    }
}

/// Read commands from stdin until it closes.
/// Runs on a plain thread so a blocked read never holds up runtime shutdown.
pub fn spawn_stdin_reader(input: SharedInput) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => match parse_command(&line) {
                    Ok(command) => input.push(command),
                    Err(CommandError::Empty) => {}
                    Err(e) => warn!(error = %e, "Bad console command"),
                },
                Err(e) => {
                    warn!(error = %e, "Failed to read console input");
                    return;
                }
            }
        }
        info!("Console input closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_movement() {
        assert_eq!(
            parse_command("left"),
            Ok(InputCommand::Hold(MoveDirection::Left))
        );
        assert_eq!(
            parse_command("  D "),
            Ok(InputCommand::Hold(MoveDirection::Right))
        );
        assert_eq!(
            parse_command("stop"),
            Ok(InputCommand::Hold(MoveDirection::Stop))
        );
    }

    #[test]
    fn test_parse_aim() {
        assert_eq!(
            parse_command("aim 400 250.5"),
            Ok(InputCommand::Aim { x: 400.0, y: 250.5 })
        );
        assert_eq!(
            parse_command("aim 400"),
            Err(CommandError::Usage("aim <x> <y>"))
        );
    }

    #[test]
    fn test_parse_shell_and_taps() {
        assert_eq!(
            parse_command("shell Heavy"),
            Ok(InputCommand::Tap(Key::ShellHeavy))
        );
        assert_eq!(parse_command("c"), Ok(InputCommand::Tap(Key::ShellExplosive)));
        assert_eq!(parse_command("w"), Ok(InputCommand::Tap(Key::Confirm)));
        assert!(matches!(
            parse_command("shell nuke"),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_command("   "), Err(CommandError::Empty));
        assert_eq!(
            parse_command("jump"),
            Err(CommandError::Unknown("jump".to_string()))
        );
    }

    #[test]
    fn test_shared_input_feeds_frames() {
        let console = SharedInput::new();
        let mut game_side = console.clone();

        console.push(InputCommand::Aim { x: 10.0, y: 20.0 });
        console.push(InputCommand::Tap(Key::Confirm));

        let frame = game_side.sample();
        assert_eq!((frame.pointer_x, frame.pointer_y), (10.0, 20.0));
        assert!(frame.is_held(Key::Confirm));
        assert!(!game_side.sample().is_held(Key::Confirm));
    }
}
