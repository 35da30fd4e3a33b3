//! Reply resolution
//!
//! OBS answers tracked requests asynchronously. A reply is matched to its
//! pending entry by `message-id`, and the entry's command decides how the
//! follow-up message is built from the reply:
//! - `ToggleSourceVisibility`: invert `visible`
//! - `ReloadBrowserSource`: toggle a trailing `#` on `sourceSettings.url`,
//!   which makes the browser source reload
//!
//! Error replies leave their entry in place.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use super::Router;
use crate::command::TrackedCommand;
use crate::pending::PendingRequest;
use crate::template::{self, SlotValue, TemplateError};

/// Marker toggled at the end of a browser source URL
pub const CACHE_BUST_MARKER: char = '#';

/// Outcome of handling one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Not JSON at all
    Malformed,
    /// OBS reported an error; any matching entry is left pending
    RemoteError(String),
    /// No id, or no pending entry with that id (events, stale replies)
    Unmatched,
    /// Matched, but the reply lacked what the follow-up needs; entry removed
    Incomplete { message_id: u64 },
    /// Matched and followed up; entry removed
    FollowUp { message_id: u64, message: String },
}

#[derive(Debug, Error)]
enum FollowUpError {
    #[error("reply has no '{0}' field")]
    MissingField(&'static str),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Toggle the cache-busting marker: strip it when present, append otherwise
pub fn cache_bust(url: &str) -> String {
    match url.strip_suffix(CACHE_BUST_MARKER) {
        Some(stripped) => stripped.to_string(),
        None => format!("{}{}", url, CACHE_BUST_MARKER),
    }
}

/// Correlation id of a reply, compared as an integer
fn message_id(payload: &Value) -> Option<u64> {
    match payload.get("message-id")? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn follow_up(entry: &PendingRequest, payload: &Value) -> Result<String, FollowUpError> {
    match entry.kind {
        TrackedCommand::ToggleSourceVisibility => {
            let visible = payload
                .get("visible")
                .and_then(Value::as_bool)
                .ok_or(FollowUpError::MissingField("visible"))?;
            let inverted = if visible { "false" } else { "true" };
            Ok(template::fill(&entry.action, SlotValue::Text(inverted))?)
        }
        TrackedCommand::ReloadBrowserSource => {
            let url = payload
                .pointer("/sourceSettings/url")
                .and_then(Value::as_str)
                .ok_or(FollowUpError::MissingField("sourceSettings.url"))?;
            Ok(template::fill(&entry.action, SlotValue::Text(&cache_bust(url)))?)
        }
    }
}

impl Router {
    /// Match a decoded reply against pending requests and build the
    /// follow-up message, without sending it
    pub fn resolve(&self, payload: &Value) -> Resolution {
        if let Some(err) = payload.get("error") {
            let err = match err {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            error!("OBS returned error: {}", err);
            return Resolution::RemoteError(err);
        }

        let Some(message_id) = message_id(payload) else {
            trace!("Inbound message carries no usable message-id");
            return Resolution::Unmatched;
        };

        debug!("Looking for action with message id `{}`", message_id);
        let Some(entry) = self.pending.take(message_id) else {
            debug!("No pending request for message id {}", message_id);
            return Resolution::Unmatched;
        };

        info!("Action `{}` was requested by OBS", entry.kind);
        match follow_up(&entry, payload) {
            Ok(message) => Resolution::FollowUp { message_id, message },
            Err(e) => {
                warn!("Cannot follow up {} for message {}: {}", entry.kind, message_id, e);
                Resolution::Incomplete { message_id }
            }
        }
    }

    /// Handle one text frame from OBS, sending the follow-up if any
    pub fn on_obs_message(&self, text: &str) -> Resolution {
        debug!("Received new message from OBS");
        let payload: Value = match serde_json::from_str(text) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Ignoring malformed message from OBS: {}", e);
                return Resolution::Malformed;
            }
        };

        let resolution = self.resolve(&payload);
        if let Resolution::FollowUp { message, .. } = &resolution {
            if let Err(e) = self.outbound.send_text(message.clone()) {
                error!("Failed to send follow-up: {}", e);
            }
        }
        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_bust_toggles_marker() {
        assert_eq!(cache_bust("http://x#"), "http://x");
        assert_eq!(cache_bust("http://x"), "http://x#");
        assert_eq!(cache_bust(""), "#");
        assert_eq!(cache_bust("#"), "");
    }

    #[test]
    fn test_message_id_coercion() {
        assert_eq!(message_id(&json!({"message-id": "5"})), Some(5));
        assert_eq!(message_id(&json!({"message-id": "007"})), Some(7));
        assert_eq!(message_id(&json!({"message-id": 12})), Some(12));
        assert_eq!(message_id(&json!({"message-id": "-1"})), None);
        assert_eq!(message_id(&json!({"message-id": "abc"})), None);
        assert_eq!(message_id(&json!({"message-id": "99999999999999999999999"})), None);
        assert_eq!(message_id(&json!({"update-type": "SwitchScenes"})), None);
    }
}
