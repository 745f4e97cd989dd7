//! Mixer - blends the muted passthrough with the enveloped loop
//!
//! Per frame and channel:
//!
//! ```text
//! dry = input × passthrough envelope
//! wet = dry × pass_gain + loop × loop_gain × loop envelope
//! out = dry × (1 − mix) + wet × mix
//! ```
//!
//! Block RMS of the dry path and of the enveloped loop path is kept for
//! metering.

use super::envelope::Envelopes;
use crate::types::AudioBuffer;

/// Gains applied by the mixer, from the block's parameter snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixSettings {
    pub pass_gain: f32,
    pub loop_gain: f32,
    /// Wet/dry ratio (0 = dry only, 1 = wet only)
    pub mix: f32,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            pass_gain: 1.0,
            loop_gain: 1.0,
            mix: 1.0,
        }
    }
}

/// Block RMS levels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Meters {
    /// Input after the passthrough envelope
    pub passthrough: f32,
    /// Loop after loop gain and the loop envelope
    pub loop_path: f32,
}

#[derive(Debug, Default)]
pub struct Mixer {
    meters: Meters,
}

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mix `len` frames of `io` starting at `offset` in place (real-time safe)
    ///
    /// `loop_buf` holds the loop output for the same frames at `0..len`.
    /// The envelopes advance once per frame.
    pub fn process(
        &mut self,
        io: &mut AudioBuffer,
        offset: usize,
        len: usize,
        loop_buf: &AudioBuffer,
        envelopes: &mut Envelopes,
        settings: MixSettings,
    ) -> Meters {
        let len = len.min(io.len().saturating_sub(offset)).min(loop_buf.len());
        let channels = io.num_channels().min(loop_buf.num_channels());
        let dry_gain = 1.0 - settings.mix;

        let mut dry_sum = 0.0f64;
        let mut loop_sum = 0.0f64;

        for i in 0..len {
            let (loop_env, pass_env) = envelopes.next_frame();
            for ch in 0..channels {
                let input = io.channel(ch)[offset + i];
                let dry = input * pass_env;
                let looped = loop_buf.channel(ch)[i] * settings.loop_gain * loop_env;
                let wet = dry * settings.pass_gain + looped;
                io.channel_mut(ch)[offset + i] = dry * dry_gain + wet * settings.mix;

                dry_sum += (dry as f64) * (dry as f64);
                loop_sum += (looped as f64) * (looped as f64);
            }
        }

        let count = (len * channels) as f64;
        self.meters = if count > 0.0 {
            Meters {
                passthrough: (dry_sum / count).sqrt() as f32,
                loop_path: (loop_sum / count).sqrt() as f32,
            }
        } else {
            Meters::default()
        };
        self.meters
    }
}
