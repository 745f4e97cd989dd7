//! Pitch/trigger controller
//!
//! Turns MIDI state and parameters into two things each block:
//! - the pending loop length (period of the glided target frequency)
//! - a trigger decision: start looping, begin the release, or carry on
//!
//! # State machine
//!
//! ```text
//!              hold || notes_down > 0
//!   Inactive ─────────────────────────► Active
//!      ▲                                  │ !hold && notes_down == 0
//!      │   loop envelope settled at 0     ▼
//!      └─────────────────────────────── Releasing
//! ```
//!
//! Releasing is still "active": the loop keeps playing under the decaying
//! envelope. A note-on during the release pulls the envelopes back up.

use super::params::ParamValues;
use super::pitch::{loop_length_samples, squeeze_to_ms, PitchState, MIN_FREQUENCY_HZ, REFERENCE_HZ};
use super::ramp::LinearRamp;
use super::midi::MidiMessage;

/// What the engine should do this block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    /// Nothing changes
    Continue,
    /// Take a snapshot and start the loop
    Start,
    /// Fade the loop out and the passthrough back in
    Release,
}

/// Decide the block's trigger action
///
/// `releasing` means the loop envelope is already heading to zero, so the
/// release is not re-armed every block.
pub fn decide(hold: bool, notes_down: u32, active: bool, releasing: bool) -> TriggerAction {
    let gate = hold || notes_down > 0;
    if gate && !active {
        TriggerAction::Start
    } else if !gate && active && !releasing {
        TriggerAction::Release
    } else {
        TriggerAction::Continue
    }
}

/// MIDI state plus the portamento glide
pub struct TriggerController {
    pitch: PitchState,
    /// Glided frequency, sampled once per block
    glide: LinearRamp,
    /// Unrounded target the glide is heading to
    target_hz: f64,
    /// False until the first block after prepare; that block snaps the glide
    primed: bool,
}

impl TriggerController {
    pub fn new() -> Self {
        Self {
            pitch: PitchState::default(),
            glide: LinearRamp::new(REFERENCE_HZ as f32, crate::types::DEFAULT_SAMPLE_RATE as f32),
            target_hz: REFERENCE_HZ,
            primed: false,
        }
    }

    /// Reset the glide for a new sample rate (held notes are kept)
    pub fn prepare(&mut self, sample_rate: u32) {
        self.glide = LinearRamp::new(REFERENCE_HZ as f32, sample_rate as f32);
        self.target_hz = REFERENCE_HZ;
        self.primed = false;
    }

    #[inline]
    pub fn pitch(&self) -> &PitchState {
        &self.pitch
    }

    #[inline]
    pub fn notes_down(&self) -> u32 {
        self.pitch.notes_down
    }

    /// Apply one MIDI message; returns true for a note-on
    pub fn handle_midi(&mut self, message: MidiMessage, midi_enabled: bool) -> bool {
        match message {
            MidiMessage::NoteOn { note, .. } => {
                self.pitch.note_on(note, midi_enabled);
                true
            }
            MidiMessage::NoteOff { .. } => {
                self.pitch.note_off();
                false
            }
            MidiMessage::PitchWheel { value, .. } => {
                self.pitch.pitch_wheel(value);
                false
            }
        }
    }

    /// Frequency the loop should track, before portamento
    pub fn base_frequency(&self, params: &ParamValues) -> f64 {
        let hz = if params.midi_enabled {
            self.pitch.note_frequency(params.pitch_bend_range)
        } else {
            let squeeze01 = (params.squeeze as f64 / 100.0).clamp(0.0, 1.0);
            1000.0 / squeeze_to_ms(squeeze01)
        };
        hz.max(MIN_FREQUENCY_HZ)
    }

    /// Advance the glide by one block and return the pending loop length
    pub fn pending_length(
        &mut self,
        params: &ParamValues,
        block_len: usize,
        sample_rate: f64,
        capacity: usize,
    ) -> usize {
        let base_hz = self.base_frequency(params);

        if !self.primed {
            self.glide.set_value(base_hz as f32);
            self.primed = true;
        } else if base_hz != self.target_hz {
            self.glide
                .arm_ramp(base_hz as f32, params.portamento_ms.max(0.0) / 1000.0);
        }
        self.target_hz = base_hz;

        self.glide.skip(block_len);
        let hz = if self.glide.is_settled() {
            self.target_hz
        } else {
            self.glide.current_value() as f64
        };

        loop_length_samples(hz, params.playback_speed as f64, sample_rate, capacity)
    }

    /// Current glided frequency (Hz)
    pub fn glide_frequency(&self) -> f64 {
        if self.glide.is_settled() {
            self.target_hz
        } else {
            self.glide.current_value() as f64
        }
    }
}

impl Default for TriggerController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params_without_glide() -> ParamValues {
        ParamValues {
            portamento_ms: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_decide_table() {
        assert_eq!(decide(false, 1, false, false), TriggerAction::Start);
        assert_eq!(decide(true, 0, false, false), TriggerAction::Start);
        assert_eq!(decide(false, 0, false, false), TriggerAction::Continue);
        assert_eq!(decide(false, 0, true, false), TriggerAction::Release);
        assert_eq!(decide(false, 0, true, true), TriggerAction::Continue);
        assert_eq!(decide(true, 0, true, false), TriggerAction::Continue);
        assert_eq!(decide(false, 2, true, false), TriggerAction::Continue);
    }

    #[test]
    fn test_squeeze_mode_pending_length() {
        let mut trigger = TriggerController::new();
        trigger.prepare(48000);
        let params = ParamValues {
            midi_enabled: false,
            hold: true,
            squeeze: 30.0,
            ..Default::default()
        };
        let pending = trigger.pending_length(&params, 512, 48000.0, 192_000);
        let expected = (squeeze_to_ms(0.30) / 1000.0 * 48000.0).round() as usize;
        assert_eq!(pending, expected);
        assert_eq!(pending, 15865);
    }

    #[test]
    fn test_midi_mode_follows_last_note() {
        let mut trigger = TriggerController::new();
        trigger.prepare(48000);
        let params = params_without_glide();

        trigger.handle_midi(MidiMessage::NoteOn { channel: 0, note: 57, velocity: 90 }, true);
        // First block snaps to the target
        assert_eq!(trigger.pending_length(&params, 512, 48000.0, 192_000), 218);

        trigger.handle_midi(MidiMessage::NoteOn { channel: 0, note: 69, velocity: 90 }, true);
        assert_eq!(trigger.pending_length(&params, 512, 48000.0, 192_000), 109);
        assert_eq!(trigger.notes_down(), 2);
    }

    #[test]
    fn test_portamento_glides_over_blocks() {
        let mut trigger = TriggerController::new();
        trigger.prepare(48000);
        let mut params = ParamValues {
            portamento_ms: 100.0,
            ..Default::default()
        };
        trigger.handle_midi(MidiMessage::NoteOn { channel: 0, note: 57, velocity: 90 }, true);
        trigger.pending_length(&params, 480, 48000.0, 192_000);
        assert!((trigger.glide_frequency() - 220.0).abs() < 1e-6);

        trigger.handle_midi(MidiMessage::NoteOn { channel: 0, note: 69, velocity: 90 }, true);
        // 480 samples = 10 ms into a 100 ms glide from 220 Hz to 440 Hz
        trigger.pending_length(&params, 480, 48000.0, 192_000);
        let hz = trigger.glide_frequency();
        assert!((hz - 242.0).abs() < 0.5, "glide at {}", hz);

        for _ in 0..20 {
            trigger.pending_length(&params, 480, 48000.0, 192_000);
        }
        assert_eq!(trigger.glide_frequency(), 440.0);

        // A target change with zero portamento lands immediately
        params.portamento_ms = 0.0;
        trigger.handle_midi(MidiMessage::NoteOn { channel: 0, note: 81, velocity: 90 }, true);
        trigger.pending_length(&params, 1, 48000.0, 192_000);
        assert!((trigger.glide_frequency() - 880.0).abs() < 1e-6);
    }

    #[test]
    fn test_midi_disabled_ignores_note_pitch() {
        let mut trigger = TriggerController::new();
        trigger.prepare(48000);
        let params = ParamValues {
            midi_enabled: false,
            squeeze: 0.0,
            portamento_ms: 0.0,
            ..Default::default()
        };
        trigger.handle_midi(MidiMessage::NoteOn { channel: 0, note: 100, velocity: 90 }, false);
        assert_eq!(trigger.notes_down(), 1);
        let pending = trigger.pending_length(&params, 512, 48000.0, 192_000);
        assert_eq!(pending, (1.337f64 * 48000.0).round() as usize);
    }

    #[test]
    fn test_note_off_and_bend() {
        let mut trigger = TriggerController::new();
        assert!(!trigger.handle_midi(MidiMessage::NoteOff { channel: 0, note: 60 }, true));
        assert_eq!(trigger.notes_down(), 0);
        trigger.handle_midi(MidiMessage::PitchWheel { channel: 0, value: 0 }, true);
        assert_eq!(trigger.pitch().bend, -1.0);
    }
}
