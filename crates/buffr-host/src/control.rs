//! Line commands read from stdin
//!
//! One command per line, whitespace separated. Empty lines are ignored.

use std::path::PathBuf;

use buffr_core::engine::ParamId;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  on <note> [vel]     note on (velocity defaults to 100)
  off <note>          note off
  bend <0-16383>      pitch wheel (8192 = centre)
  set <key> <value>   set a parameter (booleans take on/off)
  get <key>           show a parameter
  params              list all parameters
  load <wav>          load a user sample
  clear               drop the user sample
  save [path]         save engine state
  restore [path]      restore engine state
  status              show loop telemetry
  help                this text
  quit                save state and exit";

#[derive(Debug, Error, PartialEq)]
pub enum ControlError {
    #[error("Unknown command '{0}', try 'help'")]
    UnknownCommand(String),
    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("Too many arguments for '{0}'")]
    TooManyArguments(&'static str),
    #[error("Invalid {argument}: '{value}'")]
    InvalidValue {
        argument: &'static str,
        value: String,
    },
    #[error("Unknown parameter '{0}', try 'params'")]
    UnknownParam(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    Bend(u16),
    Set { id: ParamId, value: f32 },
    Get(ParamId),
    Params,
    Load(PathBuf),
    Clear,
    Save(Option<PathBuf>),
    Restore(Option<PathBuf>),
    Status,
    Help,
    Quit,
}

impl ControlCommand {
    /// Parse one input line; `Ok(None)` for a blank line
    pub fn parse(line: &str) -> Result<Option<Self>, ControlError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match name.to_lowercase().as_str() {
            "on" => {
                let [note, rest @ ..] = args.as_slice() else {
                    return Err(missing("on", "a note number"));
                };
                let velocity = match rest {
                    [] => 100,
                    [vel] => parse_midi_byte("velocity", vel)?.max(1),
                    _ => return Err(ControlError::TooManyArguments("on")),
                };
                ControlCommand::NoteOn {
                    note: parse_midi_byte("note", note)?,
                    velocity,
                }
            }
            "off" => ControlCommand::NoteOff {
                note: parse_midi_byte("note", single("off", &args, "a note number")?)?,
            },
            "bend" => {
                let raw = single("bend", &args, "a value 0-16383")?;
                let value = raw
                    .parse::<u16>()
                    .ok()
                    .filter(|v| *v <= 16383)
                    .ok_or_else(|| invalid("bend value", raw))?;
                ControlCommand::Bend(value)
            }
            "set" => {
                let [key, value] = args.as_slice() else {
                    return Err(if args.len() > 2 {
                        ControlError::TooManyArguments("set")
                    } else {
                        missing("set", "a key and a value")
                    });
                };
                ControlCommand::Set {
                    id: parse_param(key)?,
                    value: parse_value(value)?,
                }
            }
            "get" => ControlCommand::Get(parse_param(single("get", &args, "a parameter key")?)?),
            "load" => ControlCommand::Load(PathBuf::from(single("load", &args, "a WAV path")?)),
            "save" => ControlCommand::Save(optional_path("save", &args)?),
            "restore" => ControlCommand::Restore(optional_path("restore", &args)?),
            "params" => no_args("params", &args, ControlCommand::Params)?,
            "clear" => no_args("clear", &args, ControlCommand::Clear)?,
            "status" => no_args("status", &args, ControlCommand::Status)?,
            "help" | "?" => ControlCommand::Help,
            "quit" | "exit" | "q" => ControlCommand::Quit,
            other => return Err(ControlError::UnknownCommand(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn missing(command: &'static str, argument: &'static str) -> ControlError {
    ControlError::MissingArgument { command, argument }
}

fn invalid(argument: &'static str, value: &str) -> ControlError {
    ControlError::InvalidValue {
        argument,
        value: value.to_string(),
    }
}

fn single<'a>(
    command: &'static str,
    args: &[&'a str],
    argument: &'static str,
) -> Result<&'a str, ControlError> {
    match args {
        [] => Err(missing(command, argument)),
        [one] => Ok(*one),
        _ => Err(ControlError::TooManyArguments(command)),
    }
}

fn no_args(
    command: &'static str,
    args: &[&str],
    parsed: ControlCommand,
) -> Result<ControlCommand, ControlError> {
    if args.is_empty() {
        Ok(parsed)
    } else {
        Err(ControlError::TooManyArguments(command))
    }
}

fn optional_path(command: &'static str, args: &[&str]) -> Result<Option<PathBuf>, ControlError> {
    match args {
        [] => Ok(None),
        [path] => Ok(Some(PathBuf::from(path))),
        _ => Err(ControlError::TooManyArguments(command)),
    }
}

fn parse_midi_byte(argument: &'static str, raw: &str) -> Result<u8, ControlError> {
    raw.parse::<u8>()
        .ok()
        .filter(|v| *v <= 127)
        .ok_or_else(|| invalid(argument, raw))
}

fn parse_param(key: &str) -> Result<ParamId, ControlError> {
    ParamId::from_key(key).ok_or_else(|| ControlError::UnknownParam(key.to_string()))
}

fn parse_value(raw: &str) -> Result<f32, ControlError> {
    match raw.to_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(1.0),
        "off" | "false" | "no" => Ok(0.0),
        _ => raw
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid("value", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ControlCommand {
        ControlCommand::parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_blank_lines() {
        assert_eq!(ControlCommand::parse(""), Ok(None));
        assert_eq!(ControlCommand::parse("   \t "), Ok(None));
    }

    #[test]
    fn test_notes() {
        assert_eq!(parse("on 60"), ControlCommand::NoteOn { note: 60, velocity: 100 });
        assert_eq!(parse("ON 48 20"), ControlCommand::NoteOn { note: 48, velocity: 20 });
        // Velocity 0 would be a note off
        assert_eq!(parse("on 48 0"), ControlCommand::NoteOn { note: 48, velocity: 1 });
        assert_eq!(parse("off 60"), ControlCommand::NoteOff { note: 60 });
        assert_eq!(parse("bend 16383"), ControlCommand::Bend(16383));
    }

    #[test]
    fn test_note_errors() {
        assert_eq!(
            ControlCommand::parse("on"),
            Err(ControlError::MissingArgument {
                command: "on",
                argument: "a note number"
            })
        );
        assert!(matches!(
            ControlCommand::parse("on 128"),
            Err(ControlError::InvalidValue { argument: "note", .. })
        ));
        assert_eq!(
            ControlCommand::parse("on 60 100 1"),
            Err(ControlError::TooManyArguments("on"))
        );
        assert!(matches!(
            ControlCommand::parse("bend 16384"),
            Err(ControlError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_params() {
        assert_eq!(
            parse("set squeeze 42.5"),
            ControlCommand::Set {
                id: ParamId::Squeeze,
                value: 42.5
            }
        );
        assert_eq!(
            parse("set hold on"),
            ControlCommand::Set {
                id: ParamId::Hold,
                value: 1.0
            }
        );
        assert_eq!(parse("get releaseMs"), ControlCommand::Get(ParamId::ReleaseMs));
        assert_eq!(
            ControlCommand::parse("set nope 1"),
            Err(ControlError::UnknownParam("nope".to_string()))
        );
        assert!(matches!(
            ControlCommand::parse("set mix NaN"),
            Err(ControlError::InvalidValue { argument: "value", .. })
        ));
        assert!(matches!(
            ControlCommand::parse("set mix"),
            Err(ControlError::MissingArgument { command: "set", .. })
        ));
    }

    #[test]
    fn test_files_and_misc() {
        assert_eq!(parse("load /tmp/pad.wav"), ControlCommand::Load(PathBuf::from("/tmp/pad.wav")));
        assert_eq!(parse("save"), ControlCommand::Save(None));
        assert_eq!(
            parse("restore other.bin"),
            ControlCommand::Restore(Some(PathBuf::from("other.bin")))
        );
        assert_eq!(parse("clear"), ControlCommand::Clear);
        assert_eq!(parse("status"), ControlCommand::Status);
        assert_eq!(parse("params"), ControlCommand::Params);
        assert_eq!(parse("?"), ControlCommand::Help);
        assert_eq!(parse("quit"), ControlCommand::Quit);
        assert_eq!(
            ControlCommand::parse("status now"),
            Err(ControlError::TooManyArguments("status"))
        );
        assert_eq!(
            ControlCommand::parse("dance"),
            Err(ControlError::UnknownCommand("dance".to_string()))
        );
    }
}
