//! Engine parameters - descriptors, lock-free storage and per-block snapshots
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   set() (clamped)   ┌─────────────────────┐
//! │  Control thread  │────────────────────►│     LoopParams      │
//! │  (UI / host)     │                     │  [AtomicU32; 12]    │
//! └──────────────────┘                     └──────────┬──────────┘
//!                                                     │ values() once per block
//!                                                     ▼
//!                                          ┌─────────────────────┐
//!                                          │  Audio thread       │
//!                                          │  (ParamValues copy) │
//!                                          └─────────────────────┘
//! ```
//!
//! Every parameter is stored as `f32` bits in its own `AtomicU32`, so reads
//! never tear and never block. Booleans are stored as 0.0 / 1.0.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Number of engine parameters
pub const NUM_PARAMS: usize = 12;

/// How a parameter's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// On/off switch (value > 0.5 is on)
    Toggle,
    /// Whole numbers only
    Integer,
    /// Any value in range
    Continuous,
}

/// Parameter identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ParamId {
    MidiEnabled = 0,
    Hold,
    UseUserSample,
    Squeeze,
    PortamentoMs,
    PitchBendRange,
    PlaybackSpeed,
    ReleaseMs,
    LoopGain,
    PassGain,
    Mix,
    LatencyCompMs,
}

impl ParamId {
    /// All parameters in storage order
    pub const ALL: [ParamId; NUM_PARAMS] = [
        ParamId::MidiEnabled,
        ParamId::Hold,
        ParamId::UseUserSample,
        ParamId::Squeeze,
        ParamId::PortamentoMs,
        ParamId::PitchBendRange,
        ParamId::PlaybackSpeed,
        ParamId::ReleaseMs,
        ParamId::LoopGain,
        ParamId::PassGain,
        ParamId::Mix,
        ParamId::LatencyCompMs,
    ];

    /// Stable key used in persisted state and control commands
    pub fn key(self) -> &'static str {
        match self {
            ParamId::MidiEnabled => "midiEnabled",
            ParamId::Hold => "hold",
            ParamId::UseUserSample => "useUserSample",
            ParamId::Squeeze => "squeeze",
            ParamId::PortamentoMs => "portamentoMs",
            ParamId::PitchBendRange => "pitchBendRange",
            ParamId::PlaybackSpeed => "playbackSpeed",
            ParamId::ReleaseMs => "releaseMs",
            ParamId::LoopGain => "loopGain",
            ParamId::PassGain => "passGain",
            ParamId::Mix => "mix",
            ParamId::LatencyCompMs => "latencyCompMs",
        }
    }

    /// Look up a parameter by key (case-insensitive)
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.key().eq_ignore_ascii_case(key))
    }

    /// Descriptor with name, range, default and unit
    pub fn info(self) -> ParamInfo {
        match self {
            ParamId::MidiEnabled => ParamInfo::toggle("MIDI Enabled", true),
            ParamId::Hold => ParamInfo::toggle("Hold", false),
            ParamId::UseUserSample => ParamInfo::toggle("Use Loaded WAV", false),
            ParamId::Squeeze => ParamInfo::new("Squeeze", 30.0).with_range(0.0, 100.0),
            ParamId::PortamentoMs => ParamInfo::new("Portamento", 60.0)
                .with_range(0.0, 2000.0)
                .with_unit("ms"),
            ParamId::PitchBendRange => ParamInfo::new("Pitch Bend Range", 2.0)
                .with_range(0.0, 48.0)
                .with_unit("st")
                .integer(),
            ParamId::PlaybackSpeed => ParamInfo::new("Playback Speed", 1.0)
                .with_range(0.5, 2.0)
                .with_unit("x"),
            ParamId::ReleaseMs => ParamInfo::new("Release", 30.0)
                .with_range(30.0, 4000.0)
                .with_unit("ms"),
            ParamId::LoopGain => ParamInfo::new("Squeeze Gain", 1.0).with_range(0.0, 2.0),
            ParamId::PassGain => ParamInfo::new("Passthrough Gain", 1.0).with_range(0.0, 2.0),
            ParamId::Mix => ParamInfo::new("Wet / Dry", 1.0).with_range(0.0, 1.0),
            ParamId::LatencyCompMs => ParamInfo::new("Latency Comp", 0.0)
                .with_range(0.0, 200.0)
                .with_unit("ms"),
        }
    }
}

impl std::fmt::Display for ParamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Information about an engine parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamInfo {
    /// Parameter name for display
    pub name: &'static str,
    /// Default value (in actual units)
    pub default: f32,
    pub min: f32,
    pub max: f32,
    /// Unit label (e.g., "ms", "st")
    pub unit: &'static str,
    pub kind: ParamKind,
}

impl ParamInfo {
    /// Create a continuous 0..1 parameter with name and default value
    pub fn new(name: &'static str, default: f32) -> Self {
        Self {
            name,
            default,
            min: 0.0,
            max: 1.0,
            unit: "",
            kind: ParamKind::Continuous,
        }
    }

    fn toggle(name: &'static str, default: bool) -> Self {
        Self {
            kind: ParamKind::Toggle,
            ..Self::new(name, if default { 1.0 } else { 0.0 })
        }
    }

    /// Set the value range
    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Set the unit label
    pub fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// Restrict to whole numbers
    pub fn integer(mut self) -> Self {
        self.kind = ParamKind::Integer;
        self
    }

    /// Clamp (and quantize) a value into this parameter's domain
    ///
    /// NaN falls back to the default.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        match self.kind {
            ParamKind::Toggle => {
                if value > 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            ParamKind::Integer => value.round().clamp(self.min, self.max),
            ParamKind::Continuous => value.clamp(self.min, self.max),
        }
    }

    /// Map a normalized 0..1 control position to an actual value
    pub fn from_normalized(&self, normalized: f32) -> f32 {
        self.clamp(self.min + normalized.clamp(0.0, 1.0) * (self.max - self.min))
    }

    /// Map an actual value to a normalized 0..1 control position
    pub fn to_normalized(&self, value: f32) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.clamp(value) - self.min) / span).clamp(0.0, 1.0)
    }
}

/// Plain copy of every parameter value
///
/// Taken once per block on the audio thread, and used as the serialized form
/// of the parameters in saved state and host config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParamValues {
    pub midi_enabled: bool,
    pub hold: bool,
    pub use_user_sample: bool,
    pub squeeze: f32,
    pub portamento_ms: f32,
    pub pitch_bend_range: f32,
    pub playback_speed: f32,
    pub release_ms: f32,
    pub loop_gain: f32,
    pub pass_gain: f32,
    pub mix: f32,
    pub latency_comp_ms: f32,
}

impl Default for ParamValues {
    fn default() -> Self {
        let mut values = Self {
            midi_enabled: false,
            hold: false,
            use_user_sample: false,
            squeeze: 0.0,
            portamento_ms: 0.0,
            pitch_bend_range: 0.0,
            playback_speed: 0.0,
            release_ms: 0.0,
            loop_gain: 0.0,
            pass_gain: 0.0,
            mix: 0.0,
            latency_comp_ms: 0.0,
        };
        for id in ParamId::ALL {
            values.set(id, id.info().default);
        }
        values
    }
}

impl ParamValues {
    /// Read one value in actual units (booleans as 0.0 / 1.0)
    pub fn get(&self, id: ParamId) -> f32 {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        match id {
            ParamId::MidiEnabled => flag(self.midi_enabled),
            ParamId::Hold => flag(self.hold),
            ParamId::UseUserSample => flag(self.use_user_sample),
            ParamId::Squeeze => self.squeeze,
            ParamId::PortamentoMs => self.portamento_ms,
            ParamId::PitchBendRange => self.pitch_bend_range,
            ParamId::PlaybackSpeed => self.playback_speed,
            ParamId::ReleaseMs => self.release_ms,
            ParamId::LoopGain => self.loop_gain,
            ParamId::PassGain => self.pass_gain,
            ParamId::Mix => self.mix,
            ParamId::LatencyCompMs => self.latency_comp_ms,
        }
    }

    /// Write one value, clamped to the parameter's domain
    pub fn set(&mut self, id: ParamId, value: f32) {
        let value = id.info().clamp(value);
        match id {
            ParamId::MidiEnabled => self.midi_enabled = value > 0.5,
            ParamId::Hold => self.hold = value > 0.5,
            ParamId::UseUserSample => self.use_user_sample = value > 0.5,
            ParamId::Squeeze => self.squeeze = value,
            ParamId::PortamentoMs => self.portamento_ms = value,
            ParamId::PitchBendRange => self.pitch_bend_range = value,
            ParamId::PlaybackSpeed => self.playback_speed = value,
            ParamId::ReleaseMs => self.release_ms = value,
            ParamId::LoopGain => self.loop_gain = value,
            ParamId::PassGain => self.pass_gain = value,
            ParamId::Mix => self.mix = value,
            ParamId::LatencyCompMs => self.latency_comp_ms = value,
        }
    }

    /// Copy with every value clamped to its domain
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for id in ParamId::ALL {
            out.set(id, self.get(id));
        }
        out
    }
}

/// Lock-free parameter storage shared between control and audio threads
///
/// All operations use `Ordering::Relaxed`; each parameter is independent.
pub struct LoopParams {
    values: [AtomicU32; NUM_PARAMS],
}

impl LoopParams {
    /// Create storage holding every parameter's default
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|i| {
                AtomicU32::new(ParamId::ALL[i].info().default.to_bits())
            }),
        }
    }

    /// Current value of one parameter (lock-free)
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id as usize].load(Ordering::Relaxed))
    }

    /// Current value of a toggle parameter (lock-free)
    #[inline]
    pub fn get_bool(&self, id: ParamId) -> bool {
        self.get(id) > 0.5
    }

    /// Set one parameter; the value is clamped to its range
    pub fn set(&self, id: ParamId, value: f32) {
        let value = id.info().clamp(value);
        self.values[id as usize].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Snapshot every parameter (one atomic load each)
    pub fn values(&self) -> ParamValues {
        let mut values = ParamValues::default();
        for id in ParamId::ALL {
            values.set(id, self.get(id));
        }
        values
    }

    /// Store every parameter from a value set
    pub fn apply(&self, values: &ParamValues) {
        for id in ParamId::ALL {
            self.set(id, values.get(id));
        }
    }
}

impl Default for LoopParams {
    fn default() -> Self {
        Self::new()
    }
}
