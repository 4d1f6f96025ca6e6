//! Line-oriented console standing in for the front panel.
//!
//! | Input             | Action                                |
//! |-------------------|---------------------------------------|
//! | `o` / `ok`        | Press OK (snooze a ringing alarm)     |
//! | `c` / `cancel`    | Press Cancel (stop a ringing alarm)   |
//! | `m`, `u`, `d`     | Press Menu, Up, Down (no action)      |
//! | `config <msg>`    | Queue a config message                |
//! | `alarm add HH:MM` | Add an alarm                          |
//! | `alarm del N`     | Delete alarm N                        |
//! | `alarm on N`      | Re-enable alarm N                     |
//! | `alarm off`       | Disable all alarms                    |
//! | `alarm list`      | List alarms                           |
//! | `status`          | Show config and loop state            |
//! | `q` / `quit`      | Exit                                  |
//!
//! The panel has five keys but only OK and Cancel are read, and only while an
//! alarm rings. Menu, Up and Down are wired so a ring can be shown to ignore
//! them. No key does anything while no alarm is ringing.

use log::{error, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;

use medibox_core::config::{ConfigInbox, enqueue_message};
use medibox_core::input::Button;

use crate::devices::ButtonPanel;
use crate::settings::parse_hhmm;

/// Requests that must run on the main loop because they touch its state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    AddAlarm { hour: u8, minute: u8 },
    DeleteAlarm(usize),
    EnableAlarm(usize),
    DisableAlarms,
    ListAlarms,
    Status,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Press(Button),
    Config(String),
    Request(Request),
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word {
        "o" | "ok" => Command::Press(Button::Ok),
        "c" | "cancel" => Command::Press(Button::Cancel),
        "m" | "menu" => Command::Press(Button::Menu),
        "u" | "up" => Command::Press(Button::Up),
        "d" | "down" => Command::Press(Button::Down),
        "config" if !rest.is_empty() => Command::Config(rest.to_string()),
        "alarm" => Command::Request(parse_alarm(rest)?),
        "status" => Command::Request(Request::Status),
        "q" | "quit" | "exit" => Command::Request(Request::Quit),
        _ => return Err(format!("unknown command {line:?}")),
    };
    Ok(command)
}

fn parse_alarm(args: &str) -> Result<Request, String> {
    let (action, arg) = args.split_once(' ').unwrap_or((args, ""));
    let index = || {
        arg.trim()
            .parse::<usize>()
            .map_err(|_| format!("expected an alarm number, got {arg:?}"))
    };

    match action {
        "add" => {
            let (hour, minute) = parse_hhmm(arg)?;
            Ok(Request::AddAlarm { hour, minute })
        }
        "del" | "delete" => Ok(Request::DeleteAlarm(index()?)),
        "on" | "enable" => Ok(Request::EnableAlarm(index()?)),
        "off" | "disable" => Ok(Request::DisableAlarms),
        "list" | "" => Ok(Request::ListAlarms),
        other => Err(format!("unknown alarm action {other:?}")),
    }
}

/// Read stdin until EOF, pressing buttons and queueing config directly and
/// forwarding everything else to the main loop.
pub async fn run(
    panel: ButtonPanel,
    inbox: &'static ConfigInbox,
    requests: UnboundedSender<Request>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Console read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(Command::Press(button)) => panel.press(button),
            Ok(Command::Config(message)) => {
                if let Err(e) = enqueue_message(inbox, &message) {
                    warn!("Config message dropped: {}", e);
                }
            }
            Ok(Command::Request(request)) => {
                if requests.send(request).is_err() {
                    break;
                }
            }
            Err(e) => warn!("{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_commands() {
        assert_eq!(parse_command("o"), Ok(Command::Press(Button::Ok)));
        assert_eq!(parse_command(" cancel "), Ok(Command::Press(Button::Cancel)));
        assert_eq!(parse_command("d"), Ok(Command::Press(Button::Down)));
        assert_eq!(parse_command("menu"), Ok(Command::Press(Button::Menu)));
        assert_eq!(parse_command("u"), Ok(Command::Press(Button::Up)));
    }

    #[test]
    fn test_config_command_keeps_message() {
        assert_eq!(
            parse_command("config 2,10,45,0.5,28"),
            Ok(Command::Config("2,10,45,0.5,28".to_string()))
        );
        assert!(parse_command("config").is_err());
    }

    #[test]
    fn test_alarm_commands() {
        assert_eq!(
            parse_command("alarm add 07:30"),
            Ok(Command::Request(Request::AddAlarm { hour: 7, minute: 30 }))
        );
        assert_eq!(
            parse_command("alarm del 1"),
            Ok(Command::Request(Request::DeleteAlarm(1)))
        );
        assert_eq!(
            parse_command("alarm on 0"),
            Ok(Command::Request(Request::EnableAlarm(0)))
        );
        assert_eq!(
            parse_command("alarm off"),
            Ok(Command::Request(Request::DisableAlarms))
        );
        assert_eq!(parse_command("alarm"), Ok(Command::Request(Request::ListAlarms)));
        assert!(parse_command("alarm add 25:00").is_err());
        assert!(parse_command("alarm del x").is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!(parse_command("launch").is_err());
    }
}
