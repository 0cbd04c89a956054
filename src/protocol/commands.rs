//! Module `commands`
//!
//! Defines the explorer command set and parses raw command lines into it.

use serde::de::DeserializeOwned;

use crate::error::ProtocolError;
use crate::protocol::requests::{PathList, PathPair, UploadRequest};

/// Represents a command parsed from a client line.
///
/// Single-path commands take the rest of the line verbatim as the path, so
/// names with spaces need no quoting. Commands with several arguments take a
/// JSON object.
#[derive(Debug, PartialEq)]
pub enum Command {
    List(String),
    Retr(String),
    Stor(UploadRequest),
    Mkd(String),
    Dele(String),
    Move(PathPair),
    Copy(PathPair),
    Zip(PathList),
    Search(String),
    Preview(String),
    Noop,
    Quit,
    /// Known command with a missing or malformed argument
    Invalid(String),
    Unknown(String),
}

/// Represents the outcome of executing a command.
#[derive(Debug, PartialEq)]
pub enum CommandStatus {
    Continue,
    CloseConnection,
}

/// Parses a raw command string received from a client into the `Command` enum.
pub fn parse_command(raw: &str) -> Command {
    let line = raw.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    let (cmd, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (trimmed, ""),
    };

    match cmd.to_ascii_uppercase().as_str() {
        "LIST" => Command::List(arg.to_string()),
        "RETR" => required_path(arg, "RETR", Command::Retr),
        "MKD" => required_path(arg, "MKD", Command::Mkd),
        "DELE" => required_path(arg, "DELE", Command::Dele),
        "PREVIEW" => required_path(arg, "PREVIEW", Command::Preview),
        "SEARCH" => Command::Search(arg.to_string()),
        "STOR" => json_argument(arg, "STOR", Command::Stor),
        "MOVE" => json_argument(arg, "MOVE", Command::Move),
        "COPY" => json_argument(arg, "COPY", Command::Copy),
        "ZIP" => json_argument(arg, "ZIP", Command::Zip),
        "NOOP" => Command::Noop,
        "QUIT" | "Q" => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

fn required_path(arg: &str, name: &str, build: fn(String) -> Command) -> Command {
    if arg.is_empty() {
        Command::Invalid(format!("{} requires a path", name))
    } else {
        build(arg.to_string())
    }
}

fn json_argument<T: DeserializeOwned>(arg: &str, name: &str, build: fn(T) -> Command) -> Command {
    match parse_json_argument(arg, name) {
        Ok(value) => build(value),
        Err(e) => Command::Invalid(e.to_string()),
    }
}

fn parse_json_argument<T: DeserializeOwned>(arg: &str, name: &str) -> Result<T, ProtocolError> {
    if arg.is_empty() {
        return Err(ProtocolError::MalformedArgument(format!(
            "{} requires a JSON argument",
            name
        )));
    }
    serde_json::from_str(arg)
        .map_err(|e| ProtocolError::MalformedArgument(format!("{}: {}", name, e)))
}
