//! Outbound drivers
//!
//! The router only needs a way to hand a text message to the remote side.
//! The OBS WebSocket client implements it for real; tests use a recorder.

use anyhow::Result;

pub mod obs;

pub use obs::{ObsConnection, ObsInbound, ObsSender};

/// Sink for outbound protocol messages.
///
/// Implementations must not block: the router calls this from inside event
/// handling and expects the message to be queued, not delivered.
pub trait Outbound: Send + Sync {
    fn send_text(&self, text: String) -> Result<()>;
}
