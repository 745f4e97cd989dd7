//! Buffr Core - Live loop engine library
//!
//! Always records the input, freezes the most recent material on a trigger
//! and loops it at a MIDI-controlled length, mixed against the live signal.

pub mod audio;
pub mod audio_file;
pub mod config;
pub mod engine;
pub mod state;
pub mod types;

pub use types::*;
