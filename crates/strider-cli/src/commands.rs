//! Operator commands read from stdin, one per line.
//!
//!   forward | backward | left | right | neutral | stop | look_down
//!                 – queue an action intent (`w`/`s`/`a`/`d` also work)
//!   pause | resume – stop or restart driving the robot
//!   key <COMBO>   – tap controller keys, e.g. `key L2+B`
//!   help          – show this list
//!   quit | exit   – shut down

use colored::Colorize;
use strider_hal::{ControllerFrame, ControllerSender};
use strider_kernel::ControllerKeys;
use strider_runtime::ActionSender;
use strider_types::{ActionIntent, StriderError};

/// One parsed operator line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Intent(ActionIntent),
    Pause,
    Resume,
    Keys(ControllerKeys),
    Help,
    Quit,
}

/// Whether the read loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Parse one line.  Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, StriderError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "key" | "keys" => {
            if rest.is_empty() {
                return Err(StriderError::InvalidCommand(
                    "usage: key <COMBO>, e.g. key L2+B".to_string(),
                ));
            }
            Command::Keys(ControllerKeys::parse_combo(rest)?)
        }
        _ => Command::Intent(line.parse()?),
    };
    Ok(Some(command))
}

/// Carry out `command` against the running loop and controller channel.
///
/// Key combos are sent as a press frame followed by a release frame.
pub async fn apply(
    command: Command,
    actions: &ActionSender,
    controller: &ControllerSender,
) -> Result<Flow, StriderError> {
    match command {
        Command::Intent(intent) => actions.action_callback(intent)?,
        Command::Pause => {
            actions.set_running(false);
            println!("  {}", "paused".yellow());
        }
        Command::Resume => {
            actions.set_running(true);
            println!("  {}", "running".green());
        }
        Command::Keys(keys) => {
            controller.send(ControllerFrame::new(keys.bits())).await?;
            controller.send(ControllerFrame::new(0)).await?;
        }
        Command::Help => print_help(),
        Command::Quit => return Ok(Flow::Exit),
    }
    Ok(Flow::Continue)
}

pub fn print_help() {
    println!();
    println!("{}", "Strider Commands".bold().underline());
    println!("  {}  – queue a motion", "forward backward left right".bold().cyan());
    println!(
        "  {}        – decay, halt, or pitch the body down",
        "neutral stop look_down".bold().cyan()
    );
    println!(
        "  {}                  – stop or restart driving the robot",
        "pause resume".bold().cyan()
    );
    println!(
        "  {}                 – tap controller keys (L2+B damps, L2+A resumes, DOWN reports)",
        "key <COMBO>".bold().cyan()
    );
    println!("  {}                     – exit", "quit exit".bold().cyan());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strider_hal::{SimRobotClient, controller_channel};
    use strider_kernel::EstopLatch;
    use strider_runtime::{PostprocessorConfig, PostprocessorLoop, ProfileConfig};

    #[test]
    fn parses_intents_and_controls() {
        assert_eq!(parse("forward").unwrap(), Some(Command::Intent(ActionIntent::Forward)));
        assert_eq!(parse("  W ").unwrap(), Some(Command::Intent(ActionIntent::Forward)));
        assert_eq!(parse("look_down").unwrap(), Some(Command::Intent(ActionIntent::LookDown)));
        assert_eq!(parse("pause").unwrap(), Some(Command::Pause));
        assert_eq!(parse("Resume").unwrap(), Some(Command::Resume));
        assert_eq!(parse("exit").unwrap(), Some(Command::Quit));
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn parses_key_combos() {
        assert_eq!(
            parse("key L2+B").unwrap(),
            Some(Command::Keys(ControllerKeys::L2 | ControllerKeys::B))
        );
        assert_eq!(parse("key down").unwrap(), Some(Command::Keys(ControllerKeys::DOWN)));
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(matches!(parse("jump"), Err(StriderError::InvalidCommand(_))));
        assert!(matches!(parse("key"), Err(StriderError::InvalidCommand(_))));
        assert!(matches!(parse("key L2+Z"), Err(StriderError::InvalidCommand(_))));
    }

    #[tokio::test]
    async fn apply_routes_commands() {
        let client = Arc::new(SimRobotClient::new());
        let (mut postprocessor, actions) = PostprocessorLoop::new(
            PostprocessorConfig::default(),
            ProfileConfig::default(),
            client,
            EstopLatch::new(),
        )
        .unwrap();
        let (controller, mut subscription, _handle) = controller_channel(8);

        let flow = apply(Command::Intent(ActionIntent::Forward), &actions, &controller)
            .await
            .unwrap();
        assert_eq!(flow, Flow::Continue);
        postprocessor.tick().await;
        assert_eq!(
            postprocessor.actions().latest().map(|a| a.intent),
            Some(ActionIntent::Forward)
        );

        apply(Command::Pause, &actions, &controller).await.unwrap();
        assert!(!actions.is_running());
        apply(Command::Resume, &actions, &controller).await.unwrap();
        assert!(actions.is_running());

        let combo = ControllerKeys::L2 | ControllerKeys::B;
        apply(Command::Keys(combo), &actions, &controller).await.unwrap();
        assert_eq!(subscription.recv().await.map(|f| f.keys), Some(combo.bits()));
        assert_eq!(subscription.recv().await.map(|f| f.keys), Some(0));

        assert_eq!(
            apply(Command::Quit, &actions, &controller).await.unwrap(),
            Flow::Exit
        );
    }
}
