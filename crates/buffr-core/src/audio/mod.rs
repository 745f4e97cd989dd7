//! Duplex audio backend
//!
//! Runs the loop engine between a capture device and a playback device
//! through CPAL (ALSA/JACK on Linux, WASAPI on Windows, CoreAudio on macOS).
//!
//! # Architecture
//!
//! - **Control thread**: drives the engine through its `EngineController`
//! - **Output callback**: owns the `LoopEngine` exclusively
//! - **Input callback**: pushes captured frames into a lock-free queue
//!
//! # Example Usage
//!
//! ```ignore
//! use buffr_core::audio::{start_audio_system, AudioConfig};
//!
//! let mut result = start_audio_system(&AudioConfig::default().with_buffer_frames(128))?;
//! result.controller.note_on(48, 100)?;
//! let looping = result.controller.telemetry().is_looping();
//! ```

mod backend;
mod config;
mod cpal_backend;
mod device;
mod error;

pub use backend::{start_audio_system, AudioHandle, AudioSystemResult};
pub use config::{AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};
pub use device::{
    find_device_by_id, get_devices, get_input_devices, get_output_devices, resolve_device,
    AudioDevice, Direction,
};
pub use error::{AudioError, AudioResult};
