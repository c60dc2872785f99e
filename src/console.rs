//! Operator console line parsing.
//!
//! The daemon reads operator commands from stdin: account management
//! before connecting (`add`/`remove`/`list`/`done`) and runtime control
//! afterwards (`say`/`help`/`stop`/`restart`). This module only parses
//! lines; execution lives in the binary's supervisor loop.

use thiserror::Error;

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Add an account token.
    Add(String),
    /// Remove the token at the given (1-based) index.
    Remove(usize),
    /// List stored tokens.
    List,
    /// Finish token entry and connect.
    Done,
    /// Inject a chat line as the operator principal.
    Say(String),
    Help,
    Stop,
    Restart,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleParseError {
    #[error("empty line")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0} requires an argument")]
    MissingArgument(&'static str),
    #[error("invalid index: {0}")]
    BadIndex(String),
}

/// Help text printed for `help`.
pub const HELP_TEXT: &str = "\
Operator commands:
  add <token>     add an account token
  remove <index>  remove the token at <index> (see `list`)
  list            list stored tokens
  done            finish token entry and connect
  say <text>      inject <text> as a chat message from the operator
  help            show this help
  restart         restart all bots
  stop            shut down";

/// Parse one operator line.
pub fn parse_console_line(line: &str) -> Result<ConsoleCommand, ConsoleParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ConsoleParseError::Empty);
    }
    let (word, rest) = match line.split_once(' ') {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "add" => {
            if rest.is_empty() {
                Err(ConsoleParseError::MissingArgument("add"))
            } else {
                Ok(ConsoleCommand::Add(rest.to_string()))
            }
        }
        "remove" => {
            if rest.is_empty() {
                return Err(ConsoleParseError::MissingArgument("remove"));
            }
            rest.parse::<usize>()
                .ok()
                .filter(|i| *i >= 1)
                .map(ConsoleCommand::Remove)
                .ok_or_else(|| ConsoleParseError::BadIndex(rest.to_string()))
        }
        "say" => {
            if rest.is_empty() {
                Err(ConsoleParseError::MissingArgument("say"))
            } else {
                Ok(ConsoleCommand::Say(rest.to_string()))
            }
        }
        "list" => Ok(ConsoleCommand::List),
        "done" => Ok(ConsoleCommand::Done),
        "help" => Ok(ConsoleCommand::Help),
        "stop" | "exit" | "quit" => Ok(ConsoleCommand::Stop),
        "restart" => Ok(ConsoleCommand::Restart),
        other => Err(ConsoleParseError::Unknown(other.to_string())),
    }
}
