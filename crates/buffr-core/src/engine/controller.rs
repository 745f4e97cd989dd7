//! Control-thread side of the engine
//!
//! [`EngineController`] owns everything a UI, MIDI bridge or host needs to
//! drive a [`super::LoopEngine`] running on the audio thread:
//! - parameter atomics (write any time, lock-free)
//! - telemetry (read any time, lock-free)
//! - the producer ends of the command and keyboard MIDI queues
//! - the control-side handle of the loaded user sample, for saving state
//!
//! None of these calls block. Queue overflow is reported to the caller.

use std::path::Path;
use std::sync::Arc;

use basedrop::Shared;

use super::command::EngineCommand;
use super::gc::gc_handle;
use super::midi::MidiMessage;
use super::params::{LoopParams, ParamId, ParamValues};
use super::telemetry::LoopTelemetry;
use crate::audio_file::{load_user_sample, LoadError, UserSample};
use crate::state::{decode_state, encode_state, StateError};

pub struct EngineController {
    params: Arc<LoopParams>,
    telemetry: Arc<LoopTelemetry>,
    commands: rtrb::Producer<EngineCommand>,
    keyboard: rtrb::Producer<MidiMessage>,
    user_sample: Option<Shared<UserSample>>,
}

impl EngineController {
    pub fn new(
        params: Arc<LoopParams>,
        telemetry: Arc<LoopTelemetry>,
        commands: rtrb::Producer<EngineCommand>,
        keyboard: rtrb::Producer<MidiMessage>,
    ) -> Self {
        Self {
            params,
            telemetry,
            commands,
            keyboard,
            user_sample: None,
        }
    }

    pub fn params(&self) -> &Arc<LoopParams> {
        &self.params
    }

    pub fn telemetry(&self) -> &Arc<LoopTelemetry> {
        &self.telemetry
    }

    // ─────────────────────────────────────────────────────────────
    // Parameters
    // ─────────────────────────────────────────────────────────────

    /// Set a parameter (clamped to its range)
    pub fn set_param(&self, id: ParamId, value: f32) {
        self.params.set(id, value);
    }

    pub fn param(&self, id: ParamId) -> f32 {
        self.params.get(id)
    }

    pub fn param_values(&self) -> ParamValues {
        self.params.values()
    }

    pub fn apply_params(&self, values: &ParamValues) {
        self.params.apply(values);
    }

    // ─────────────────────────────────────────────────────────────
    // Keyboard MIDI
    // ─────────────────────────────────────────────────────────────

    /// Queue a MIDI message for the next block; a full queue returns it
    pub fn send_midi(&mut self, message: MidiMessage) -> Result<(), MidiMessage> {
        self.keyboard
            .push(message)
            .map_err(|rtrb::PushError::Full(message)| message)
    }

    pub fn note_on(&mut self, note: u8, velocity: u8) -> Result<(), MidiMessage> {
        self.send_midi(MidiMessage::NoteOn {
            channel: 0,
            note: note.min(127),
            velocity: velocity.clamp(1, 127),
        })
    }

    pub fn note_off(&mut self, note: u8) -> Result<(), MidiMessage> {
        self.send_midi(MidiMessage::NoteOff {
            channel: 0,
            note: note.min(127),
        })
    }

    /// Pitch wheel position, 0..=16383 with 8192 at centre
    pub fn pitch_wheel(&mut self, value: u16) -> Result<(), MidiMessage> {
        self.send_midi(MidiMessage::PitchWheel {
            channel: 0,
            value: value.min(16383),
        })
    }

    // ─────────────────────────────────────────────────────────────
    // User sample
    // ─────────────────────────────────────────────────────────────

    /// Decode a WAV file and stage it as the user sample
    ///
    /// Decoding happens on the calling thread. On error the previously
    /// loaded sample stays in place.
    pub fn load_sample<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LoadError> {
        let sample = load_user_sample(
            path,
            self.telemetry.capacity(),
            self.telemetry.channels(),
            self.telemetry.sample_rate(),
        )?;
        self.stage_user_sample(sample)
    }

    /// Hand an already-fitted sample to the engine
    pub fn stage_user_sample(&mut self, sample: UserSample) -> Result<(), LoadError> {
        let shared = Shared::new(&gc_handle(), sample);
        self.commands
            .push(EngineCommand::LoadUserSample(shared.clone()))
            .map_err(|_| LoadError::EngineBusy)?;
        self.user_sample = Some(shared);
        Ok(())
    }

    /// Drop the staged user sample; a loop already playing it is unaffected
    pub fn clear_user_sample(&mut self) -> Result<(), LoadError> {
        self.commands
            .push(EngineCommand::ClearUserSample)
            .map_err(|_| LoadError::EngineBusy)?;
        self.user_sample = None;
        Ok(())
    }

    pub fn has_user_sample(&self) -> bool {
        self.user_sample.is_some()
    }

    pub fn user_sample(&self) -> Option<&UserSample> {
        self.user_sample.as_deref()
    }

    // ─────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────

    /// Serialize the parameters and the loaded user sample
    ///
    /// The sample is written in the engine's current format, so one loaded
    /// before a re-prepare is saved the way the engine now plays it.
    pub fn save_state(&self) -> Result<Vec<u8>, StateError> {
        let sample = self.user_sample();
        let refit = sample.and_then(|sample| {
            sample.refit(
                self.telemetry.capacity().max(1),
                self.telemetry.channels().max(1),
            )
        });
        encode_state(&self.params.values(), refit.as_ref().or(sample))
    }

    /// Restore saved parameters and user sample
    ///
    /// The sample is fitted to the current engine format. Without a saved
    /// sample the loaded one is kept. On error nothing is applied.
    pub fn restore_state(&mut self, bytes: &[u8]) -> Result<(), StateError> {
        let state = decode_state(bytes)?;

        if let Some(buffer) = state.sample {
            let fitted = UserSample::fit(
                &buffer,
                self.telemetry.capacity().max(1),
                self.telemetry.channels().max(1),
            );
            let sample = UserSample::new(fitted, self.telemetry.sample_rate(), "restored");
            self.stage_user_sample(sample)
                .map_err(|_| StateError::EngineBusy)?;
        }

        self.params.apply(&state.params);
        log::info!(
            "[ENGINE] Restored state (user sample: {})",
            if self.has_user_sample() { "yes" } else { "no" }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{create_engine, EngineConfig};
    use crate::types::{AudioBuffer, ChannelLayout};
    use tempfile::TempDir;

    fn controller() -> EngineController {
        let (_engine, controller) =
            create_engine(&EngineConfig::new(1000, 64, ChannelLayout::Stereo)).unwrap();
        controller
    }

    #[test]
    fn test_params_are_clamped() {
        let controller = controller();
        controller.set_param(ParamId::Squeeze, 250.0);
        assert_eq!(controller.param(ParamId::Squeeze), 100.0);
        controller.set_param(ParamId::Hold, 1.0);
        assert!(controller.param_values().hold);
    }

    #[test]
    fn test_keyboard_queue_full() {
        let mut controller = controller();
        for _ in 0..crate::engine::KEYBOARD_QUEUE_CAPACITY {
            controller.note_on(60, 100).unwrap();
        }
        assert_eq!(
            controller.note_off(60),
            Err(MidiMessage::NoteOff { channel: 0, note: 60 })
        );
    }

    #[test]
    fn test_load_sample_from_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pad.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 1000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(8192i16).unwrap();
        }
        writer.finalize().unwrap();

        let mut controller = controller();
        controller.load_sample(&path).unwrap();
        let sample = controller.user_sample().unwrap();
        // Capacity at 1 kHz is 4000 frames, stereo
        assert_eq!(sample.len(), 4000);
        assert_eq!(sample.num_channels(), 2);
        assert_eq!(sample.channel(1)[99], 0.25);
        assert_eq!(sample.channel(1)[100], 0.0);

        // A failed load keeps the previous sample
        assert!(controller.load_sample(dir.path().join("missing.wav")).is_err());
        assert!(controller.has_user_sample());

        controller.clear_user_sample().unwrap();
        assert!(!controller.has_user_sample());
    }

    #[test]
    fn test_save_and_restore_state() {
        let mut source = controller();
        source.set_param(ParamId::ReleaseMs, 900.0);
        source.set_param(ParamId::UseUserSample, 1.0);
        let buffer = AudioBuffer::from_channels(vec![vec![0.5; 10]]);
        source
            .stage_user_sample(UserSample::new(UserSample::fit(&buffer, 4000, 2), 1000, "a"))
            .unwrap();
        let bytes = source.save_state().unwrap();

        let mut target = controller();
        target.restore_state(&bytes).unwrap();
        assert_eq!(target.param(ParamId::ReleaseMs), 900.0);
        assert!(target.param_values().use_user_sample);
        let restored = target.user_sample().unwrap();
        assert_eq!(restored.len(), 4000);
        assert_eq!(restored.channel(0)[9], 0.5);
        assert_eq!(restored.channel(1)[10], 0.0);
    }

    #[test]
    fn test_save_state_uses_current_format() {
        let (mut engine, mut source) =
            create_engine(&EngineConfig::new(1000, 64, ChannelLayout::Stereo)).unwrap();
        let buffer = AudioBuffer::from_channels(vec![vec![0.5; 4000], vec![-0.5; 4000]]);
        source
            .stage_user_sample(UserSample::new(buffer, 1000, "a"))
            .unwrap();
        engine
            .prepare(&EngineConfig::new(2000, 64, ChannelLayout::Mono))
            .unwrap();

        let state = decode_state(&source.save_state().unwrap()).unwrap();
        let saved = state.sample.unwrap();
        assert_eq!(saved.num_channels(), 1);
        assert_eq!(saved.len(), 8000);
        assert_eq!(saved.channel(0)[3999], 0.5);
        assert_eq!(saved.channel(0)[4000], 0.0);
    }

    #[test]
    fn test_restore_without_sample_keeps_loaded_one() {
        let mut controller = controller();
        let buffer = AudioBuffer::from_channels(vec![vec![0.5; 4000], vec![0.5; 4000]]);
        controller
            .stage_user_sample(UserSample::new(buffer, 1000, "kept"))
            .unwrap();

        let bytes = encode_state(&ParamValues::default(), None).unwrap();
        controller.restore_state(&bytes).unwrap();
        assert_eq!(controller.user_sample().map(|s| s.name()), Some("kept"));
    }

    #[test]
    fn test_failed_restore_applies_nothing() {
        let mut controller = controller();
        controller.set_param(ParamId::Mix, 0.3);
        let bytes = encode_state(
            &ParamValues {
                mix: 0.9,
                ..Default::default()
            },
            None,
        )
        .unwrap();
        assert!(controller.restore_state(&bytes[..bytes.len() - 2]).is_err());
        assert_eq!(controller.param(ParamId::Mix), 0.3);
    }
}
