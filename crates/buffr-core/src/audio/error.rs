//! Audio backend error types

use thiserror::Error;

use crate::engine::ConfigError;

/// Errors that can occur during audio operations
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio devices available
    #[error("No audio devices found")]
    NoDevices,

    /// Failed to get default device
    #[error("Failed to get default audio device: {0}")]
    NoDefaultDevice(String),

    /// Device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to get device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/play stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// Input and output devices settled on different rates
    #[error("Sample rate mismatch: input={input}Hz, output={output}Hz")]
    SampleRateMismatch { input: u32, output: u32 },

    /// The engine rejected the negotiated format
    #[error("Engine configuration rejected: {0}")]
    Engine(#[from] ConfigError),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
