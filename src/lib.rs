//! MIDI OBS Bridge
//!
//! Drives OBS Studio from a MIDI controller. Incoming MIDI events are looked
//! up in a binding table and turned into obs-websocket messages; requests
//! whose effect depends on OBS state are tracked by message id and followed
//! up when OBS replies.

pub mod bindings;
pub mod command;
pub mod config;
pub mod drivers;
pub mod error;
pub mod midi;
pub mod pending;
pub mod router;
pub mod scale;
pub mod template;

pub use bindings::{Binding, BindingStore, BindingTable, EventType, InputKind, SharedBindings};
pub use command::{Command, TrackedCommand, ValueTransform};
pub use error::{DispatchError, StartupError};
pub use router::{Dispatch, Resolution, Router};
