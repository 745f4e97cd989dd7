//! Loop-presence and passthrough-mute envelopes
//!
//! Two linear ramps advanced once per sample frame:
//! - `loop_env`: 0 = loop silent, 1 = loop at full level
//! - `mute_env`: 1 = live input passes through, 0 = input muted
//!
//! Starting a loop fades the loop in and the input out over a fixed 30 ms;
//! releasing swaps them back over the release time.

use super::ramp::LinearRamp;

/// Fade time used when a loop starts or recovers from a release (seconds)
pub const START_FADE_SECONDS: f32 = 0.03;

/// Shortest release ramp (seconds)
pub const MIN_RELEASE_SECONDS: f32 = 0.001;

/// Loop envelope target at or below which the loop counts as released
const FLOOR_TARGET: f32 = 0.001;

/// Loop envelope level at or below which a settled loop is silent
const FLOOR_LEVEL: f32 = 0.002;

#[derive(Debug, Clone, Copy)]
pub struct Envelopes {
    loop_env: LinearRamp,
    mute_env: LinearRamp,
}

impl Envelopes {
    pub fn new() -> Self {
        let sr = crate::types::DEFAULT_SAMPLE_RATE as f32;
        Self {
            loop_env: LinearRamp::new(0.0, sr),
            mute_env: LinearRamp::new(1.0, sr),
        }
    }

    /// Loop silent, passthrough open
    pub fn prepare(&mut self, sample_rate: u32) {
        let sr = sample_rate as f32;
        self.loop_env = LinearRamp::new(0.0, sr);
        self.mute_env = LinearRamp::new(1.0, sr);
    }

    /// Fade a fresh loop in from silence and mute the input
    pub fn start(&mut self) {
        self.loop_env.set_value(0.0);
        self.recover();
    }

    /// Pull both envelopes back towards looping from wherever they are
    pub fn recover(&mut self) {
        self.loop_env.arm_ramp(1.0, START_FADE_SECONDS);
        self.mute_env.arm_ramp(0.0, START_FADE_SECONDS);
    }

    /// Fade the loop out and the input back in over `release_ms`
    pub fn release(&mut self, release_ms: f32) {
        let seconds = (release_ms / 1000.0).max(MIN_RELEASE_SECONDS);
        self.loop_env.arm_ramp(0.0, seconds);
        self.mute_env.arm_ramp(1.0, seconds);
    }

    /// Check if the loop envelope is heading to (or resting at) zero
    #[inline]
    pub fn is_releasing(&self) -> bool {
        self.loop_env.target_value() <= 0.0
    }

    /// Check if the loop envelope has settled at its floor
    #[inline]
    pub fn is_silent(&self) -> bool {
        self.loop_env.is_settled()
            && self.loop_env.target_value() <= FLOOR_TARGET
            && self.loop_env.current_value() <= FLOOR_LEVEL
    }

    /// Advance one frame; returns `(loop gain, passthrough gain)`
    #[inline]
    pub fn next_frame(&mut self) -> (f32, f32) {
        let loop_gain = self.loop_env.next_value();
        let pass_gain = self.mute_env.next_value().clamp(0.0, 1.0);
        (loop_gain, pass_gain)
    }

    #[inline]
    pub fn loop_level(&self) -> f32 {
        self.loop_env.current_value()
    }

    #[inline]
    pub fn passthrough_level(&self) -> f32 {
        self.mute_env.current_value()
    }
}

impl Default for Envelopes {
    fn default() -> Self {
        Self::new()
    }
}
