//! MIDI input connection
//!
//! Opens one input port with `midir` and forwards decoded messages into a
//! Tokio channel. The port callback runs on midir's own thread and never
//! blocks: if the channel is full the event is dropped and logged.

use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{format_hex, MidiMessage};
use crate::error::StartupError;

const CLIENT_NAME: &str = "midi-obs-bridge";

/// Decoded message from the controller
#[derive(Debug, Clone)]
pub struct MidiEvent {
    pub timestamp: Instant,
    pub message: MidiMessage,
}

/// Open MIDI input connection; closing it stops the callback
pub struct MidiInputDriver {
    port_name: String,
    conn: Option<MidiInputConnection<()>>,
}

/// Find a port by exact name, falling back to a case-insensitive substring
fn find_port(midi_in: &MidiInput, pattern: &str) -> Option<(MidiInputPort, String)> {
    let named: Vec<(MidiInputPort, String)> = midi_in
        .ports()
        .into_iter()
        .filter_map(|port| midi_in.port_name(&port).ok().map(|name| (port, name)))
        .collect();

    let needle = pattern.to_lowercase();
    let exact = named.iter().position(|(_, name)| name == pattern);
    let partial = || named.iter().position(|(_, name)| name.to_lowercase().contains(&needle));

    let index = exact.or_else(partial)?;
    let (port, name) = named.into_iter().nth(index)?;
    debug!("Found port '{}' matching pattern '{}'", name, pattern);
    Some((port, name))
}

impl MidiInputDriver {
    /// Connect to `port_name` and forward events to `event_tx`.
    ///
    /// Fails with [`StartupError::MidiUnavailable`] when the port is missing
    /// or cannot be opened; the caller is expected to abort.
    pub fn connect(port_name: &str, event_tx: mpsc::Sender<MidiEvent>) -> Result<Self, StartupError> {
        let unavailable = || StartupError::MidiUnavailable {
            port: port_name.to_string(),
        };

        let mut midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| {
            warn!("Failed to create MIDI input: {}", e);
            unavailable()
        })?;
        midi_in.ignore(Ignore::All);

        debug!("Attempting to open MIDI port '{}'", port_name);
        let (port, resolved_name) = find_port(&midi_in, port_name).ok_or_else(unavailable)?;

        let conn = midi_in
            .connect(
                &port,
                CLIENT_NAME,
                move |_stamp, data, _| match MidiMessage::parse(data) {
                    Some(message) => {
                        let event = MidiEvent {
                            timestamp: Instant::now(),
                            message,
                        };
                        if let Err(e) = event_tx.try_send(event) {
                            warn!("Dropping MIDI event: {}", e);
                        }
                    }
                    None => debug!("Failed to parse MIDI: {}", format_hex(data)),
                },
                (),
            )
            .map_err(|e| {
                warn!("Failed to connect to MIDI port '{}': {}", resolved_name, e);
                unavailable()
            })?;

        info!("Successfully initialized MIDI port '{}'", resolved_name);
        Ok(Self {
            port_name: resolved_name,
            conn: Some(conn),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Close the port; safe to call more than once
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            debug!("Attempting to close MIDI port '{}'", self.port_name);
            conn.close();
            info!("MIDI connection has been closed successfully");
        }
    }
}

impl Drop for MidiInputDriver {
    fn drop(&mut self) {
        self.close();
    }
}
