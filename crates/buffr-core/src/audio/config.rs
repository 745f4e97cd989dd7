//! Audio backend configuration
//!
//! Device selection, buffer size and sample rate for the duplex stream.

use serde::{Deserialize, Serialize};

use crate::types::{ChannelLayout, DEFAULT_SAMPLE_RATE};

/// Largest device callback handled in one engine call (frames)
///
/// Longer callbacks are processed in chunks of this size.
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Default buffer size when no preference is specified (frames)
pub const DEFAULT_BUFFER_SIZE: u32 = 256;

/// Preferred buffer size for audio streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Use [`DEFAULT_BUFFER_SIZE`]
    #[default]
    Default,
    /// Request a specific buffer size in frames (clamped to 32..=MAX_BUFFER_SIZE)
    Fixed(u32),
}

impl BufferSize {
    /// Buffer size in frames
    pub fn frames(&self) -> u32 {
        match self {
            BufferSize::Default => DEFAULT_BUFFER_SIZE,
            BufferSize::Fixed(frames) => (*frames).clamp(32, MAX_BUFFER_SIZE as u32),
        }
    }

    /// Latency of one buffer in milliseconds at the given sample rate
    pub fn latency_ms(&self, sample_rate: u32) -> f32 {
        (self.frames() as f32 / sample_rate.max(1) as f32) * 1000.0
    }
}

/// Audio device identifier
///
/// Includes both the device name and the host backend (JACK, ALSA, etc.)
/// so devices with the same name on different hosts can be told apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the system
    pub name: String,
    /// Audio host name (e.g., "JACK", "ALSA", "CoreAudio")
    /// If None, every host is searched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    /// Display label including the host if available
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Configuration for the duplex audio backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture device (None = host default input)
    pub input_device: Option<DeviceId>,
    /// Playback device (None = host default output)
    pub output_device: Option<DeviceId>,
    /// Preferred buffer size
    pub buffer_size: BufferSize,
    /// Preferred sample rate (None = [`DEFAULT_SAMPLE_RATE`])
    pub sample_rate: Option<u32>,
    /// Engine bus layout
    pub layout: ChannelLayout,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            buffer_size: BufferSize::default(),
            sample_rate: None,
            layout: ChannelLayout::Stereo,
        }
    }
}

impl AudioConfig {
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }

    pub fn with_input_device(mut self, device: DeviceId) -> Self {
        self.input_device = Some(device);
        self
    }

    pub fn with_output_device(mut self, device: DeviceId) -> Self {
        self.output_device = Some(device);
        self
    }

    pub fn with_layout(mut self, layout: ChannelLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sample rate to request from the devices
    ///
    /// If the devices don't support it, the backend falls back to their maximum.
    pub fn target_sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = AudioConfig::default()
            .with_sample_rate(44100)
            .with_buffer_frames(128)
            .with_input_device(DeviceId::new("mic"))
            .with_output_device(DeviceId::with_host("hw:0,0", "ALSA"))
            .with_layout(ChannelLayout::Mono);

        assert_eq!(config.target_sample_rate(), 44100);
        assert_eq!(config.buffer_size.frames(), 128);
        assert_eq!(config.input_device.as_ref().map(|d| d.name.as_str()), Some("mic"));
        assert_eq!(
            config.output_device.as_ref().map(DeviceId::display_label),
            Some("[ALSA] hw:0,0".to_string())
        );
        assert_eq!(config.layout, ChannelLayout::Mono);
    }

    #[test]
    fn test_buffer_size_bounds() {
        assert_eq!(BufferSize::Default.frames(), DEFAULT_BUFFER_SIZE);
        assert_eq!(BufferSize::Fixed(1).frames(), 32);
        assert_eq!(BufferSize::Fixed(1 << 20).frames(), MAX_BUFFER_SIZE as u32);
        assert!((BufferSize::Fixed(480).latency_ms(48000) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AudioConfig = serde_yaml::from_str("sample_rate: 96000\n").unwrap();
        assert_eq!(config.target_sample_rate(), 96000);
        assert_eq!(config.buffer_size, BufferSize::Default);
        assert_eq!(config.layout, ChannelLayout::Stereo);
        assert!(config.output_device.is_none());
    }
}
