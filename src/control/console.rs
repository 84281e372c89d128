//! # Console Commands
//!
//! Line-oriented grammar for the interactive console.

use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::encoder::{Command, ReportInterval};

/// Console usage text
pub const HELP: &str = "\
Commands:
  auto | manual            switch board mode
  led on|off               switch the light (manual mode)
  interval <ms>            reporting interval: 1000, 2500, 5000, 10000
  night start|end +|-      move the night window by one hour
  tx <token>               send a raw command token
  rec <path>               record telemetry to a CSV file
  stop                     stop recording
  connect [port]           open the configured or given port
  disconnect               close the port
  ports                    list serial ports
  status                   show the live state
  help                     show this text
  quit                     exit";

/// What the operator asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAction {
    /// Send a command from the fixed vocabulary
    Send(Command),
    /// Send an arbitrary token as-is
    SendToken(String),
    StartRecording(PathBuf),
    StopRecording,
    /// Connect to the given port, or the configured one
    Connect(Option<String>),
    Disconnect,
    Status,
    ListPorts,
    Help,
    Quit,
}

/// Console input that does not parse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlParseError {
    #[error("empty input")]
    Empty,

    #[error("unknown command '{0}' (type 'help')")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one console line
///
/// Keywords are case-insensitive; paths, ports and tokens keep their case.
///
/// # Examples
///
/// ```
/// use smartroom_link::control::{parse_action, ControlAction};
/// use smartroom_link::protocol::encoder::{Command, ReportInterval};
///
/// assert_eq!(parse_action("led on"), Ok(ControlAction::Send(Command::LightOn)));
/// assert_eq!(
///     parse_action("interval 2500"),
///     Ok(ControlAction::Send(Command::Interval(ReportInterval::Ms2500)))
/// );
/// ```
pub fn parse_action(input: &str) -> Result<ControlAction, ControlParseError> {
    let input = input.trim();
    let (keyword, rest) = match input.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (input, ""),
    };

    if keyword.is_empty() {
        return Err(ControlParseError::Empty);
    }

    let args: Vec<&str> = rest.split_whitespace().collect();
    let action = match keyword.to_ascii_lowercase().as_str() {
        "auto" => ControlAction::Send(Command::ModeAuto),
        "manual" => ControlAction::Send(Command::ModeManual),
        "led" => match args.as_slice() {
            [state] if state.eq_ignore_ascii_case("on") => ControlAction::Send(Command::LightOn),
            [state] if state.eq_ignore_ascii_case("off") => ControlAction::Send(Command::LightOff),
            _ => return Err(ControlParseError::Usage("led on|off")),
        },
        "interval" => {
            let interval = match args.as_slice() {
                [ms] => ms.parse().ok().and_then(ReportInterval::from_millis),
                _ => None,
            };
            match interval {
                Some(interval) => ControlAction::Send(Command::Interval(interval)),
                None => return Err(ControlParseError::Usage("interval 1000|2500|5000|10000")),
            }
        }
        "night" => {
            let command = match args.as_slice() {
                [edge, step] => match (edge.to_ascii_lowercase().as_str(), *step) {
                    ("start", "+") => Some(Command::NightStartIncrement),
                    ("start", "-") => Some(Command::NightStartDecrement),
                    ("end", "+") => Some(Command::NightEndIncrement),
                    ("end", "-") => Some(Command::NightEndDecrement),
                    _ => None,
                },
                _ => None,
            };
            match command {
                Some(command) => ControlAction::Send(command),
                None => return Err(ControlParseError::Usage("night start|end +|-")),
            }
        }
        "tx" => match args.as_slice() {
            [token] => ControlAction::SendToken(token.to_string()),
            _ => return Err(ControlParseError::Usage("tx <token>")),
        },
        "rec" => {
            if rest.is_empty() {
                return Err(ControlParseError::Usage("rec <path>"));
            }
            ControlAction::StartRecording(PathBuf::from(rest))
        }
        "stop" => ControlAction::StopRecording,
        "connect" => match args.as_slice() {
            [] => ControlAction::Connect(None),
            [port] => ControlAction::Connect(Some(port.to_string())),
            _ => return Err(ControlParseError::Usage("connect [port]")),
        },
        "disconnect" => ControlAction::Disconnect,
        "ports" => ControlAction::ListPorts,
        "status" => ControlAction::Status,
        "help" | "?" => ControlAction::Help,
        "quit" | "exit" => ControlAction::Quit,
        _ => return Err(ControlParseError::Unknown(keyword.to_string())),
    };

    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_commands() {
        assert_eq!(parse_action("auto"), Ok(ControlAction::Send(Command::ModeAuto)));
        assert_eq!(parse_action("  MANUAL  "), Ok(ControlAction::Send(Command::ModeManual)));
    }

    #[test]
    fn test_led() {
        assert_eq!(parse_action("led on"), Ok(ControlAction::Send(Command::LightOn)));
        assert_eq!(parse_action("led OFF"), Ok(ControlAction::Send(Command::LightOff)));
        assert_eq!(parse_action("led"), Err(ControlParseError::Usage("led on|off")));
        assert_eq!(parse_action("led dim"), Err(ControlParseError::Usage("led on|off")));
    }

    #[test]
    fn test_interval() {
        for interval in ReportInterval::ALL {
            let line = format!("interval {}", interval.millis());
            assert_eq!(parse_action(&line), Ok(ControlAction::Send(Command::Interval(interval))));
        }
        assert!(matches!(parse_action("interval 3000"), Err(ControlParseError::Usage(_))));
        assert!(matches!(parse_action("interval fast"), Err(ControlParseError::Usage(_))));
        assert!(matches!(parse_action("interval"), Err(ControlParseError::Usage(_))));
    }

    #[test]
    fn test_night_window() {
        assert_eq!(parse_action("night start +"), Ok(ControlAction::Send(Command::NightStartIncrement)));
        assert_eq!(parse_action("night start -"), Ok(ControlAction::Send(Command::NightStartDecrement)));
        assert_eq!(parse_action("night end +"), Ok(ControlAction::Send(Command::NightEndIncrement)));
        assert_eq!(parse_action("night END -"), Ok(ControlAction::Send(Command::NightEndDecrement)));
        assert!(matches!(parse_action("night start"), Err(ControlParseError::Usage(_))));
        assert!(matches!(parse_action("night noon +"), Err(ControlParseError::Usage(_))));
    }

    #[test]
    fn test_raw_token_keeps_case() {
        assert_eq!(parse_action("tx SNI"), Ok(ControlAction::SendToken("SNI".to_string())));
        assert_eq!(parse_action("tx"), Err(ControlParseError::Usage("tx <token>")));
    }

    #[test]
    fn test_recording() {
        assert_eq!(
            parse_action("rec logs/My Room.csv"),
            Ok(ControlAction::StartRecording(PathBuf::from("logs/My Room.csv")))
        );
        assert_eq!(parse_action("rec"), Err(ControlParseError::Usage("rec <path>")));
        assert_eq!(parse_action("stop"), Ok(ControlAction::StopRecording));
    }

    #[test]
    fn test_connection_lifecycle() {
        assert_eq!(parse_action("connect"), Ok(ControlAction::Connect(None)));
        assert_eq!(
            parse_action("connect /dev/ttyACM0"),
            Ok(ControlAction::Connect(Some("/dev/ttyACM0".to_string())))
        );
        assert_eq!(parse_action("disconnect"), Ok(ControlAction::Disconnect));
        assert_eq!(parse_action("ports"), Ok(ControlAction::ListPorts));
    }

    #[test]
    fn test_misc() {
        assert_eq!(parse_action("status"), Ok(ControlAction::Status));
        assert_eq!(parse_action("help"), Ok(ControlAction::Help));
        assert_eq!(parse_action("?"), Ok(ControlAction::Help));
        assert_eq!(parse_action("quit"), Ok(ControlAction::Quit));
        assert_eq!(parse_action("exit"), Ok(ControlAction::Quit));
    }

    #[test]
    fn test_empty_and_unknown() {
        assert_eq!(parse_action(""), Err(ControlParseError::Empty));
        assert_eq!(parse_action("   \t"), Err(ControlParseError::Empty));
        assert_eq!(parse_action("reboot now"), Err(ControlParseError::Unknown("reboot".to_string())));
    }

    #[test]
    fn test_help_mentions_every_keyword() {
        for keyword in ["auto", "manual", "led", "interval", "night", "tx", "rec", "stop", "connect", "disconnect", "ports", "status", "quit"] {
            assert!(HELP.contains(keyword), "HELP is missing {}", keyword);
        }
    }
}
