//! Control commands.
//!
//! Four parameterless requests drive the instance: start, stop, step and
//! reset. Each is a `POST` with no body. Sending one does not wait for the
//! telemetry that reflects it, and a failed send is never retried here.

pub mod http;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{info, warn};

pub use http::HttpTransport;

/// A lifecycle command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Resume or begin execution.
    Start,
    /// Halt execution.
    Stop,
    /// Execute one instruction, then halt.
    Step,
    /// Return to the initial state.
    Reset,
}

impl Command {
    pub const ALL: [Command; 4] = [Command::Start, Command::Stop, Command::Step, Command::Reset];

    /// HTTP method used for every command.
    pub const fn method(self) -> &'static str {
        "POST"
    }

    /// Request path on the control surface.
    pub const fn path(self) -> &'static str {
        match self {
            Command::Start => "/start",
            Command::Stop => "/stop",
            Command::Step => "/step",
            Command::Reset => "/reset",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path()[1..])
    }
}

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown command '{}' (expected start, stop, step or reset)", s))
    }
}

/// Acknowledgement of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Status code the instance answered with.
    pub status: u16,
}

/// Errors from sending a command.
#[derive(Debug, Error)]
pub enum CommandTransportError {
    #[error("cannot reach {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The instance answered with a non-success status.
    #[error("{command} rejected with status {status}")]
    Rejected { command: Command, status: u16 },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Carries a command to the instance.
pub trait CommandTransport {
    fn send(&self, command: Command) -> Result<Ack, CommandTransportError>;
}

/// Issues commands through a transport.
#[derive(Debug, Clone)]
pub struct CommandClient<T> {
    transport: T,
}

impl<T: CommandTransport> CommandClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one command. Errors are logged and returned, not retried.
    pub fn send(&self, command: Command) -> Result<Ack, CommandTransportError> {
        match self.transport.send(command) {
            Ok(ack) => {
                info!(%command, status = ack.status, "command acknowledged");
                Ok(ack)
            }
            Err(err) => {
                warn!(%command, error = %err, "command failed");
                Err(err)
            }
        }
    }

    pub fn start(&self) -> Result<Ack, CommandTransportError> {
        self.send(Command::Start)
    }

    pub fn stop(&self) -> Result<Ack, CommandTransportError> {
        self.send(Command::Stop)
    }

    pub fn step(&self) -> Result<Ack, CommandTransportError> {
        self.send(Command::Step)
    }

    pub fn reset(&self) -> Result<Ack, CommandTransportError> {
        self.send(Command::Reset)
    }
}
