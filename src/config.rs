//! Configuration management
//!
//! Handles loading, parsing, and hot-reloading of the bridge configuration.
//! YAML is the native format; `.json` files are parsed as JSON.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::warn;

use crate::bindings::BindingTable;

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub midi: MidiConfig,
    #[serde(default)]
    pub obs: ObsConfig,
    #[serde(default)]
    pub bindings: BindingTable,
}

/// MIDI port configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiConfig {
    /// Exact port name, or a case-insensitive fragment of it
    pub input_port: String,
}

/// OBS WebSocket configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObsConfig {
    #[serde(default = "default_obs_host")]
    pub host: String,
    #[serde(default = "default_obs_port")]
    pub port: u16,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            host: default_obs_host(),
            port: default_obs_port(),
        }
    }
}

impl ObsConfig {
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

fn format_for(path: &str) -> Format {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
        _ => Format::Yaml,
    }
}

impl AppConfig {
    /// Load configuration from file
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents, path)
    }

    /// Parse configuration text; `path` picks the format and labels errors
    pub fn parse(contents: &str, path: &str) -> Result<Self> {
        let config: AppConfig = match format_for(path) {
            Format::Json => serde_json::from_str(contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path))?,
            Format::Yaml => serde_yaml::from_str(contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path))?,
        };

        if config.midi.input_port.trim().is_empty() {
            anyhow::bail!("Config {} has an empty midi.input_port", path);
        }

        Ok(config)
    }

    /// Log every misconfigured binding; returns how many problems were found
    pub fn report_binding_problems(&self) -> usize {
        let problems = self.bindings.validate();
        for problem in &problems {
            warn!("Binding {}", problem);
        }
        problems.len()
    }
}

// Default value functions
fn default_obs_host() -> String { "localhost".to_string() }
fn default_obs_port() -> u16 { 4444 }
