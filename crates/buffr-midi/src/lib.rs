//! Hardware MIDI input for the Buffr live looper
//!
//! This crate provides:
//! - MIDI port discovery via midir
//! - Note and pitch-bend parsing via midly
//! - A channel bridge from the driver callback to the host
//!
//! # Architecture
//!
//! ```text
//! MIDI Device → midir callback → flume channel → host loop → engine keyboard queue
//! ```

mod connection;
mod input;

pub use connection::{port_matches, MidiConnection, MidiConnectionError};
pub use input::{MidiInputEvent, MidiInputHandler, PITCH_WHEEL_CENTER};
