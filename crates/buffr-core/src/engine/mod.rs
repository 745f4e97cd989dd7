//! Live loop engine
//!
//! This module contains the real-time engine and its control surface:
//! - Recorder: always-on ring of the last few seconds of input
//! - Snapshot: frozen copy of the ring (or a user sample) used as loop source
//! - Looper: fractional playhead with seam crossfade and boundary-only retune
//! - Trigger: MIDI/squeeze pitch tracking, portamento and start/release logic
//! - Envelopes + Mixer: loop fade in/out, passthrough muting and wet/dry
//! - LoopEngine: the per-block pipeline tying everything together
//! - EngineController: lock-free control-thread API

mod command;
mod config;
mod controller;
mod engine;
mod envelope;
pub mod gc;
mod looper;
mod midi;
mod mixer;
mod params;
mod pitch;
mod ramp;
mod recorder;
mod snapshot;
mod telemetry;
mod trigger;

pub use command::*;
pub use config::*;
pub use controller::*;
pub use engine::*;
pub use envelope::*;
pub use looper::*;
pub use midi::*;
pub use mixer::*;
pub use params::*;
pub use pitch::*;
pub use ramp::*;
pub use recorder::*;
pub use snapshot::*;
pub use telemetry::*;
pub use trigger::*;
