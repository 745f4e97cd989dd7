//! Engine configuration and bus-layout validation

use thiserror::Error;

use crate::types::{ChannelLayout, DEFAULT_SAMPLE_RATE};

/// Largest block the engine processes in one pass by default
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 1024;

/// Engine configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Unsupported channel layout: {input} in, {output} out (expected mono or stereo on both buses)")]
    UnsupportedLayout { input: usize, output: usize },
    #[error("Sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("Maximum block size must be greater than zero")]
    InvalidBlockSize,
}

/// Format the engine is prepared for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Longest block processed in one pass; longer blocks are split
    pub max_block_size: usize,
    pub input_channels: usize,
    pub output_channels: usize,
}

impl EngineConfig {
    /// Config with the same layout on both buses
    pub fn new(sample_rate: u32, max_block_size: usize, layout: ChannelLayout) -> Self {
        Self {
            sample_rate,
            max_block_size,
            input_channels: layout.channels(),
            output_channels: layout.channels(),
        }
    }

    /// Check the config and return its channel layout
    pub fn validate(&self) -> Result<ChannelLayout, ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        if self.max_block_size == 0 {
            return Err(ConfigError::InvalidBlockSize);
        }
        match ChannelLayout::from_channels(self.input_channels) {
            Some(layout) if self.input_channels == self.output_channels => Ok(layout),
            _ => Err(ConfigError::UnsupportedLayout {
                input: self.input_channels,
                output: self.output_channels,
            }),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_MAX_BLOCK_SIZE, ChannelLayout::Stereo)
    }
}
