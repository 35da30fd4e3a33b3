//! Commands a binding can name
//!
//! A binding either sends its action verbatim (no command), drives a value
//! from a fader, or issues a tracked request whose reply produces a
//! follow-up message.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Closed set of commands understood by the router.
///
/// Names are the obs-websocket request names used in binding tables.
/// Anything else is kept as [`Command::Unknown`] so a typo in one row is
/// reported when that row fires instead of rejecting the whole table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Command {
    ToggleSourceVisibility,
    ReloadBrowserSource,
    SetSourcePosition,
    SetSourceScale,
    SetVolume,
    SetSourceRotation,
    SetTransitionDuration,
    SetSyncOffset,
    Unknown(String),
}

/// Commands whose reply is turned into a follow-up message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedCommand {
    ToggleSourceVisibility,
    ReloadBrowserSource,
}

/// Post-scaling transform applied before a fader value is substituted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTransform {
    /// Substitute the scaled float unchanged (position, scale)
    Identity,
    /// Raise to the third power (volume). Tuned by ear, keep as is.
    Cubic,
    /// Truncate toward zero (rotation, duration, offset)
    Truncate,
}

/// Fader value after its transform, ready for a template slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaderValue {
    Float(f64),
    Int(i64),
}

impl Command {
    pub fn name(&self) -> &str {
        match self {
            Command::ToggleSourceVisibility => "ToggleSourceVisibility",
            Command::ReloadBrowserSource => "ReloadBrowserSource",
            Command::SetSourcePosition => "SetSourcePosition",
            Command::SetSourceScale => "SetSourceScale",
            Command::SetVolume => "SetVolume",
            Command::SetSourceRotation => "SetSourceRotation",
            Command::SetTransitionDuration => "SetTransitionDuration",
            Command::SetSyncOffset => "SetSyncOffset",
            Command::Unknown(name) => name,
        }
    }

    /// The tracked kind, if this command needs a reply before acting
    pub fn tracked(&self) -> Option<TrackedCommand> {
        match self {
            Command::ToggleSourceVisibility => Some(TrackedCommand::ToggleSourceVisibility),
            Command::ReloadBrowserSource => Some(TrackedCommand::ReloadBrowserSource),
            _ => None,
        }
    }

    /// The transform for fader-driven commands, `None` for everything else
    pub fn value_transform(&self) -> Option<ValueTransform> {
        match self {
            Command::SetSourcePosition | Command::SetSourceScale => Some(ValueTransform::Identity),
            Command::SetVolume => Some(ValueTransform::Cubic),
            Command::SetSourceRotation
            | Command::SetTransitionDuration
            | Command::SetSyncOffset => Some(ValueTransform::Truncate),
            Command::ToggleSourceVisibility
            | Command::ReloadBrowserSource
            | Command::Unknown(_) => None,
        }
    }
}

impl From<String> for Command {
    fn from(name: String) -> Self {
        match name.as_str() {
            "ToggleSourceVisibility" => Command::ToggleSourceVisibility,
            "ReloadBrowserSource" => Command::ReloadBrowserSource,
            "SetSourcePosition" => Command::SetSourcePosition,
            "SetSourceScale" => Command::SetSourceScale,
            "SetVolume" => Command::SetVolume,
            "SetSourceRotation" => Command::SetSourceRotation,
            "SetTransitionDuration" => Command::SetTransitionDuration,
            "SetSyncOffset" => Command::SetSyncOffset,
            _ => Command::Unknown(name),
        }
    }
}

impl From<Command> for String {
    fn from(command: Command) -> Self {
        command.name().to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TrackedCommand {
    pub fn command(self) -> Command {
        match self {
            TrackedCommand::ToggleSourceVisibility => Command::ToggleSourceVisibility,
            TrackedCommand::ReloadBrowserSource => Command::ReloadBrowserSource,
        }
    }

    /// The obs-websocket request that fetches the state the follow-up needs
    pub fn request_type(self) -> &'static str {
        match self {
            TrackedCommand::ToggleSourceVisibility => "GetSceneItemProperties",
            TrackedCommand::ReloadBrowserSource => "GetSourceSettings",
        }
    }

    /// Request field that carries the binding's target
    pub fn target_field(self) -> &'static str {
        match self {
            TrackedCommand::ToggleSourceVisibility => "item",
            TrackedCommand::ReloadBrowserSource => "sourceName",
        }
    }

    /// Build the request envelope sent for this command.
    ///
    /// The message id is sent as a string; replies echo it back verbatim.
    pub fn request(self, message_id: u64, target: &str) -> String {
        let mut envelope = json!({
            "request-type": self.request_type(),
            "message-id": message_id.to_string(),
        });
        envelope[self.target_field()] = json!(target);
        envelope.to_string()
    }
}

impl fmt::Display for TrackedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command().name())
    }
}

impl ValueTransform {
    pub fn apply(self, scaled: f64) -> FaderValue {
        match self {
            ValueTransform::Identity => FaderValue::Float(scaled),
            ValueTransform::Cubic => FaderValue::Float(scaled.powi(3)),
            ValueTransform::Truncate => FaderValue::Int(scaled.trunc() as i64),
        }
    }
}
