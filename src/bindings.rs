//! Binding table: MIDI event keys to outbound actions
//!
//! Bindings are kept as an ordered list. Several rows may share one
//! `(event_type, key)`; they form a fallback chain where the first row that
//! sends successfully wins.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::command::Command;
use crate::template;

/// MIDI event class a binding listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    NoteOn,
    ProgramChange,
    ControlChange,
}

impl EventType {
    /// Discrete triggers (notes, program changes)
    pub fn is_button_like(self) -> bool {
        matches!(self, EventType::NoteOn | EventType::ProgramChange)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::NoteOn => "note_on",
            EventType::ProgramChange => "program_change",
            EventType::ControlChange => "control_change",
        };
        f.write_str(name)
    }
}

/// How a control-change binding behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// Momentary trigger; on a controller it fires only at full travel
    #[default]
    Button,
    /// Continuous value driver
    Fader,
}

/// One row of the mapping table
///
/// Field aliases accept rows written for the older flat table format
/// (`msg_type`, `msgNoC`, `input_type`, `request`/`cmd`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Binding {
    #[serde(alias = "msg_type")]
    pub event_type: EventType,

    /// Note, program or controller number
    #[serde(alias = "msgNoC")]
    pub key: u8,

    #[serde(default, alias = "input_type")]
    pub input_kind: InputKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, alias = "request", alias = "cmd", skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_low: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_high: Option<f64>,
}

impl Binding {
    /// Button binding that sends `action` verbatim
    pub fn button(event_type: EventType, key: u8, action: impl Into<String>) -> Self {
        Self {
            event_type,
            key,
            input_kind: InputKind::Button,
            action: Some(action.into()),
            command: None,
            target: None,
            scale_low: None,
            scale_high: None,
        }
    }

    /// Button binding that issues a tracked request against `target`
    pub fn tracked(
        event_type: EventType,
        key: u8,
        action: impl Into<String>,
        command: Command,
        target: impl Into<String>,
    ) -> Self {
        Self {
            command: Some(command),
            target: Some(target.into()),
            ..Self::button(event_type, key, action)
        }
    }

    /// Control-change fader binding driving `command` over `[low, high]`
    pub fn fader(control: u8, action: impl Into<String>, command: Command, low: f64, high: f64) -> Self {
        Self {
            input_kind: InputKind::Fader,
            command: Some(command),
            scale_low: Some(low),
            scale_high: Some(high),
            ..Self::button(EventType::ControlChange, control, action)
        }
    }

    /// Action template, treating an empty string as missing
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref().filter(|a| !a.is_empty())
    }

    /// Target name, treating an empty string as missing
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref().filter(|t| !t.is_empty())
    }

    pub fn scale_range(&self) -> Option<(f64, f64)> {
        self.scale_low.zip(self.scale_high)
    }

    /// Configuration problems in this row, if any
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let templated = self.input_kind == InputKind::Fader
            || self.command.as_ref().is_some_and(|c| c.tracked().is_some());
        match self.action() {
            None => problems.push("no action".to_string()),
            Some(action) if templated => {
                if let Err(e) = template::check(action) {
                    problems.push(format!("bad action template: {}", e));
                }
            }
            Some(_) => {}
        }

        if self.input_kind == InputKind::Fader {
            if self.event_type.is_button_like() {
                problems.push(format!("fader input on {} event", self.event_type));
            }
            match &self.command {
                Some(cmd) if cmd.value_transform().is_some() => {}
                Some(cmd) if cmd.tracked().is_some() && self.target().is_none() => {
                    problems.push(format!("{} request without target", cmd));
                }
                Some(cmd) => problems.push(format!("{} cannot be driven by a fader", cmd)),
                None => problems.push("fader without command".to_string()),
            }
            if let Some((low, high)) = self.scale_range() {
                if !low.is_finite() || !high.is_finite() {
                    problems.push("non-finite scale range".to_string());
                }
            } else {
                problems.push("fader without scale_low/scale_high".to_string());
            }
        } else if let Some(cmd) = &self.command {
            if cmd.tracked().is_none() {
                problems.push(format!("no reply template for {}", cmd));
            } else if self.target().is_none() {
                problems.push(format!("{} request without target", cmd));
            }
        }

        problems
    }
}

/// Lookup interface the router consumes
pub trait BindingStore: Send + Sync {
    /// Candidate bindings for an event key, in stored order
    fn find(&self, event_type: EventType, key: u8) -> Vec<Binding>;
}

/// In-memory ordered binding table
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BindingTable {
    bindings: Vec<Binding>,
}

impl BindingTable {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    /// Describe every misconfigured row as `"#index event:key: problem"`.
    ///
    /// Rows are never rejected; a broken row just fails when it fires.
    pub fn validate(&self) -> Vec<String> {
        self.iter()
            .enumerate()
            .flat_map(|(index, binding)| {
                binding.problems().into_iter().map(move |problem| {
                    format!("#{} {}:{}: {}", index, binding.event_type, binding.key, problem)
                })
            })
            .collect()
    }
}

impl BindingStore for BindingTable {
    fn find(&self, event_type: EventType, key: u8) -> Vec<Binding> {
        self.iter()
            .filter(|b| b.event_type == event_type && b.key == key)
            .cloned()
            .collect()
    }
}

impl FromIterator<Binding> for BindingTable {
    fn from_iter<I: IntoIterator<Item = Binding>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Binding table shared between the router and the config watcher
#[derive(Debug, Clone, Default)]
pub struct SharedBindings {
    inner: Arc<RwLock<BindingTable>>,
}

impl SharedBindings {
    pub fn new(table: BindingTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(table)),
        }
    }

    /// Swap in a freshly loaded table; lookups already running keep the old rows
    pub fn replace(&self, table: BindingTable) {
        *self.inner.write() = table;
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl BindingStore for SharedBindings {
    fn find(&self, event_type: EventType, key: u8) -> Vec<Binding> {
        self.inner.read().find(event_type, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_preserves_stored_order() {
        let table = BindingTable::new(vec![
            Binding::button(EventType::NoteOn, 36, "first"),
            Binding::button(EventType::NoteOn, 37, "other"),
            Binding::button(EventType::NoteOn, 36, "second"),
            Binding::button(EventType::ProgramChange, 36, "program"),
        ]);

        let found = table.find(EventType::NoteOn, 36);
        let actions: Vec<_> = found.iter().map(|b| b.action().unwrap()).collect();
        assert_eq!(actions, vec!["first", "second"]);

        assert!(table.find(EventType::ControlChange, 36).is_empty());
    }

    #[test]
    fn test_empty_strings_count_as_missing() {
        let mut binding = Binding::tracked(EventType::NoteOn, 1, "", Command::ReloadBrowserSource, "");
        assert_eq!(binding.action(), None);
        assert_eq!(binding.target(), None);

        binding.action = Some("x".to_string());
        assert_eq!(binding.action(), Some("x"));
    }

    #[test]
    fn test_deserialize_flat_legacy_row() {
        let row = r#"{
            "msg_type": "control_change",
            "msgNoC": 7,
            "input_type": "fader",
            "action": "{\"request-type\":\"SetVolume\",\"source\":\"Mic\",\"volume\":%s}",
            "cmd": "SetVolume",
            "scale_low": 0,
            "scale_high": 1
        }"#;
        let binding: Binding = serde_json::from_str(row).unwrap();
        assert_eq!(binding.event_type, EventType::ControlChange);
        assert_eq!(binding.key, 7);
        assert_eq!(binding.input_kind, InputKind::Fader);
        assert_eq!(binding.command, Some(Command::SetVolume));
        assert_eq!(binding.scale_range(), Some((0.0, 1.0)));
        assert!(binding.problems().is_empty());
    }

    #[test]
    fn test_deserialize_defaults_to_button() {
        let row = r#"{"event_type": "note_on", "key": 40, "action": "render=%s", "request": "ToggleSourceVisibility", "target": "Cam"}"#;
        let binding: Binding = serde_json::from_str(row).unwrap();
        assert_eq!(binding.input_kind, InputKind::Button);
        assert_eq!(binding.command, Some(Command::ToggleSourceVisibility));
        assert!(binding.problems().is_empty());
    }

    #[test]
    fn test_validate_reports_without_rejecting() {
        let mut fader_missing_target = Binding::fader(3, "%s", Command::ToggleSourceVisibility, 0.0, 1.0);
        fader_missing_target.target = None;

        let table = BindingTable::new(vec![
            Binding::button(EventType::NoteOn, 1, "ok"),
            Binding {
                action: None,
                ..Binding::button(EventType::NoteOn, 2, "")
            },
            fader_missing_target,
            Binding::tracked(EventType::NoteOn, 4, "%s", Command::SetVolume, "Mic"),
        ]);

        let problems = table.validate();
        assert_eq!(problems.len(), 3);
        assert!(problems[0].starts_with("#1 note_on:2"));
        assert!(problems[1].contains("ToggleSourceVisibility request without target"));
        assert!(problems[2].contains("no reply template for SetVolume"));
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_validate_checks_templates_of_templated_rows() {
        let table = BindingTable::new(vec![
            // verbatim rows are never parsed as templates
            Binding::button(EventType::NoteOn, 1, "100% literal"),
            Binding::fader(2, r#"{"volume":%0.3f}"#, Command::SetVolume, 0.0, 1.0),
            Binding::fader(3, r#"{"volume":%q}"#, Command::SetVolume, 0.0, 1.0),
            Binding::tracked(EventType::NoteOn, 4, "no slot", Command::ReloadBrowserSource, "Alerts"),
        ]);

        let problems = table.validate();
        assert_eq!(problems.len(), 2, "{:?}", problems);
        assert!(problems[0].starts_with("#2 control_change:3: bad action template"));
        assert!(problems[1].starts_with("#3 note_on:4: bad action template"));
    }

    #[test]
    fn test_fader_on_button_like_event_is_reported() {
        let binding = Binding {
            event_type: EventType::ProgramChange,
            ..Binding::fader(5, "%s", Command::SetVolume, 0.0, 1.0)
        };
        assert_eq!(binding.problems(), vec!["fader input on program_change event".to_string()]);
    }

    #[test]
    fn test_shared_bindings_replace() {
        let shared = SharedBindings::new(BindingTable::new(vec![Binding::button(
            EventType::NoteOn,
            1,
            "old",
        )]));
        let view = shared.clone();

        shared.replace(BindingTable::new(vec![
            Binding::button(EventType::NoteOn, 1, "new"),
            Binding::button(EventType::NoteOn, 2, "more"),
        ]));

        assert_eq!(view.len(), 2);
        assert!(!view.is_empty());
        assert_eq!(view.find(EventType::NoteOn, 1)[0].action(), Some("new"));
    }
}
