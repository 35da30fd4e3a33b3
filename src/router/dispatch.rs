//! MIDI event dispatch
//!
//! Button-like events (notes, program changes) walk their candidate
//! bindings in order until one sends. Control changes do the same, except
//! that fader rows drive a scaled value and button rows only fire at full
//! travel.

use tracing::{debug, error, trace, warn};

use super::Router;
use crate::bindings::{Binding, EventType, InputKind};
use crate::command::FaderValue;
use crate::error::DispatchError;
use crate::midi::MidiMessage;
use crate::scale::{scale, MIDI_MAX, MIDI_MIN};
use crate::template::{self, SlotValue};

/// Controller value at which a button-kind control-change binding fires
pub const BUTTON_PRESS_VALUE: u8 = 127;

/// Outcome of dispatching one MIDI event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// No binding applies (unbound key, released control, unhandled type)
    Ignored,
    /// A message was sent untracked
    Sent,
    /// A tracked request was sent and registered under `message_id`
    Tracked { message_id: u64 },
    /// Bindings exist but every candidate failed
    Exhausted,
}

impl Router {
    /// Dispatch a decoded MIDI message
    pub fn on_midi(&self, message: &MidiMessage) -> Dispatch {
        debug!("Received {} from MIDI", message);

        match *message {
            MidiMessage::NoteOn { note, .. } => self.handle_button(EventType::NoteOn, note),
            // Program changes carry no value, so they can only act as buttons
            MidiMessage::ProgramChange { program, .. } => {
                self.handle_button(EventType::ProgramChange, program)
            }
            MidiMessage::ControlChange { cc, value, .. } => self.handle_fader(cc, value),
            _ => {
                trace!("No dispatch for {}", message);
                Dispatch::Ignored
            }
        }
    }

    fn handle_button(&self, event_type: EventType, key: u8) -> Dispatch {
        let candidates = self.bindings.find(event_type, key);
        if candidates.is_empty() {
            debug!("Could not find action for {} {}", event_type, key);
            return Dispatch::Ignored;
        }

        for binding in &candidates {
            match self.send_action(binding) {
                Ok(outcome) => return outcome,
                Err(e) => self.report(binding, &e),
            }
        }
        Dispatch::Exhausted
    }

    fn handle_fader(&self, control: u8, value: u8) -> Dispatch {
        let candidates = self.bindings.find(EventType::ControlChange, control);
        if candidates.is_empty() {
            debug!("Could not find action for fader {}", control);
            return Dispatch::Ignored;
        }

        for binding in &candidates {
            let result = match binding.input_kind {
                InputKind::Button => {
                    if value != BUTTON_PRESS_VALUE {
                        trace!("Control {} at {} is not a press", control, value);
                        return Dispatch::Ignored;
                    }
                    self.send_action(binding)
                }
                InputKind::Fader => self.drive_fader(binding, value).map(|()| Dispatch::Sent),
            };

            match result {
                Ok(outcome) => return outcome,
                Err(e) => self.report(binding, &e),
            }
        }
        Dispatch::Exhausted
    }

    /// Send a binding's action, issuing a tracked request when its command
    /// needs a reply first.
    ///
    /// Nothing is transmitted when the binding is misconfigured.
    pub fn send_action(&self, binding: &Binding) -> Result<Dispatch, DispatchError> {
        let action = binding.action().ok_or(DispatchError::MissingAction)?;

        let Some(command) = &binding.command else {
            debug!("No request body for action {}, sending action", action);
            self.transmit(action.to_string())?;
            return Ok(Dispatch::Sent);
        };

        let kind = command.tracked().ok_or_else(|| DispatchError::MissingTemplate {
            command: command.clone(),
        })?;
        let target = binding.target().ok_or_else(|| DispatchError::MissingTarget {
            command: command.clone(),
        })?;

        // Register before sending so the reply can never outrun its entry
        let message_id = self.pending.register(action, kind);
        if let Err(e) = self.transmit(kind.request(message_id, target)) {
            self.pending.cancel(message_id);
            return Err(e);
        }

        debug!("Sent {} request for '{}' as message {}", kind, target, message_id);
        Ok(Dispatch::Tracked { message_id })
    }

    /// Scale a controller value into the binding's range and send it
    fn drive_fader(&self, binding: &Binding, value: u8) -> Result<(), DispatchError> {
        let action = binding.action().ok_or(DispatchError::MissingAction)?;
        let transform = binding
            .command
            .as_ref()
            .and_then(|c| c.value_transform())
            .ok_or_else(|| DispatchError::NotAFaderCommand {
                command: binding.command.clone(),
            })?;
        let (low, high) = binding.scale_range().ok_or(DispatchError::MissingScale)?;

        // NaN or infinity would make the action invalid JSON
        let scaled = scale(f64::from(value), MIDI_MIN, MIDI_MAX, low, high)?;
        if !scaled.is_finite() {
            return Err(DispatchError::NonFiniteValue(scaled));
        }
        let slot = match transform.apply(scaled) {
            FaderValue::Float(v) if !v.is_finite() => return Err(DispatchError::NonFiniteValue(v)),
            FaderValue::Float(v) => SlotValue::Float(v),
            FaderValue::Int(v) => SlotValue::Int(v),
        };

        self.transmit(template::fill(action, slot)?)
    }

    fn transmit(&self, text: String) -> Result<(), DispatchError> {
        self.outbound
            .send_text(text)
            .map_err(|e| DispatchError::Transport(e.to_string()))
    }

    fn report(&self, binding: &Binding, err: &DispatchError) {
        if err.is_configuration() {
            warn!(
                "Skipping {}:{} binding: {}",
                binding.event_type, binding.key, err
            );
        } else {
            error!(
                "Failed to send {}:{} binding: {}",
                binding.event_type, binding.key, err
            );
        }
    }
}
