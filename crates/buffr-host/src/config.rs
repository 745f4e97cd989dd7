//! Host configuration
//!
//! Stored as YAML in the user's config directory.
//! Default location: ~/.config/buffr/host.yaml

use std::path::PathBuf;

use buffr_core::audio::AudioConfig;
use buffr_core::config::default_state_path;
use buffr_core::engine::ParamValues;
use serde::{Deserialize, Serialize};

/// Config file name under the buffr config dir
pub const HOST_CONFIG_FILE: &str = "host.yaml";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Devices, buffer size, sample rate and bus layout
    pub audio: AudioConfig,
    /// Substring of the MIDI input port to connect (None = no hardware MIDI)
    pub midi_port: Option<String>,
    /// Parameter values applied at startup, before any saved state
    pub params: ParamValues,
    /// Engine state restored at startup and saved on quit
    pub state_path: Option<PathBuf>,
    /// Telemetry status line interval (0 = off)
    pub status_interval_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            midi_port: None,
            params: ParamValues::default(),
            state_path: Some(default_state_path()),
            status_interval_ms: 0,
        }
    }
}
