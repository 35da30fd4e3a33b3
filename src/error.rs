//! Error types for the mapping engine and the bootstrap path
//!
//! Dispatch errors are per-attempt and never leave the router: a failing
//! binding is skipped and the next candidate is tried. Startup errors are the
//! only fatal class and carry the process exit code.

use thiserror::Error;

use crate::command::Command;
use crate::scale::ScaleError;
use crate::template::TemplateError;

/// Why a single binding candidate could not be sent
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no action supplied in binding")]
    MissingAction,

    #[error("missing target in {command} request")]
    MissingTarget { command: Command },

    #[error("missing reply template for request {command}")]
    MissingTemplate { command: Command },

    #[error("fader binding has no scale range")]
    MissingScale,

    #[error("fader value {0} is not a finite number")]
    NonFiniteValue(f64),

    #[error("fader binding has no value command (got {command:?})")]
    NotAFaderCommand { command: Option<Command> },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Scale(#[from] ScaleError),

    #[error("outbound transport refused message: {0}")]
    Transport(String),
}

impl DispatchError {
    /// Configuration problems are expected in hand-written tables and are
    /// reported at warn; transport refusals are not the table's fault.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, DispatchError::Transport(_))
    }
}

/// Failures that abort the process before the event loop starts
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("config file {path} doesn't exist or is damaged: {reason}")]
    Config { path: String, reason: String },

    #[error("MIDI device '{port}' is not connected or has a different name")]
    MidiUnavailable { port: String },

    #[error("cannot reach OBS at {url}: {reason}")]
    ObsUnavailable { url: String, reason: String },
}

impl StartupError {
    /// Process exit code: ENOENT for config problems, EIO for devices.
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupError::Config { .. } => 2,
            StartupError::MidiUnavailable { .. } | StartupError::ObsUnavailable { .. } => 5,
        }
    }
}
