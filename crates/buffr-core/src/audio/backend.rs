//! Audio system handle and startup
//!
//! The backend uses the same lock-free architecture everywhere:
//! - the control thread drives the engine through its [`EngineController`]
//! - the output stream's callback owns the [`crate::engine::LoopEngine`] exclusively
//! - the input stream hands captured frames to the output callback over an SPSC queue

use cpal::Stream;

use crate::engine::EngineController;

use super::config::AudioConfig;
use super::error::AudioResult;

/// Result of starting the audio system
pub struct AudioSystemResult {
    /// Handle to keep audio alive (drop to stop)
    pub handle: AudioHandle,
    /// Control-thread side of the engine running in the output callback
    pub controller: EngineController,
    /// Sample rate shared by both streams
    pub sample_rate: u32,
    /// Requested buffer size in frames
    pub buffer_size: u32,
    /// Audio latency in milliseconds (one buffer, output only)
    pub latency_ms: f32,
}

/// Handle to the active audio streams
///
/// Keeps both streams alive. Drop this to stop audio.
pub struct AudioHandle {
    pub(crate) _input_stream: Stream,
    pub(crate) _output_stream: Stream,
    pub(crate) sample_rate: u32,
    pub(crate) buffer_size: u32,
    pub(crate) input_name: String,
    pub(crate) output_name: String,
}

impl AudioHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Requested buffer size in frames
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// One-way output latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }
}

/// Start the duplex audio system with the given configuration
///
/// Opens the input and output devices, creates a prepared engine at the
/// negotiated sample rate and moves it into the output callback.
pub fn start_audio_system(config: &AudioConfig) -> AudioResult<AudioSystemResult> {
    super::cpal_backend::start_audio_system(config)
}
