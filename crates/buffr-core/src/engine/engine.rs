//! Live loop engine - ties together recorder, trigger, looper and mixer
//!
//! # Per-block pipeline
//!
//! ```text
//! commands ─► params snapshot ─► recorder.write(input)
//!                                     │
//! MIDI (host + keyboard) ─► trigger ──┤ note-on: re-snapshot, recover envelopes
//!                                     ▼
//!                pending length ─► start / release decision
//!                                     │
//!                  looper.render ─► mixer (envelopes per frame) ─► output
//!                                     │
//!                           deactivate once the loop envelope is silent
//!                                     ▼
//!                                 telemetry
//! ```
//!
//! The engine is owned exclusively by the audio thread. Everything it needs
//! from other threads arrives through atomics ([`LoopParams`]) or lock-free
//! queues ([`EngineCommand`], keyboard MIDI), and everything it reports goes
//! out through [`LoopTelemetry`].

use std::sync::Arc;

use basedrop::Shared;

use crate::audio_file::UserSample;
use crate::types::AudioBuffer;

use super::command::{command_channel, EngineCommand};
use super::config::{ConfigError, EngineConfig};
use super::controller::EngineController;
use super::envelope::Envelopes;
use super::gc::gc_handle;
use super::looper::LoopState;
use super::midi::{keyboard_channel, MidiMessage, MidiScheduler, TimedMidiEvent};
use super::mixer::{MixSettings, Mixer};
use super::params::{LoopParams, ParamValues};
use super::recorder::RingRecorder;
use super::snapshot::{Snapshot, SnapshotSource};
use super::telemetry::LoopTelemetry;
use super::trigger::{decide, TriggerAction, TriggerController};

/// Loop engine for the audio thread
pub struct LoopEngine {
    /// Prepared format; `None` until the first successful prepare
    config: Option<EngineConfig>,
    params: Arc<LoopParams>,
    telemetry: Arc<LoopTelemetry>,
    commands: rtrb::Consumer<EngineCommand>,
    keyboard: rtrb::Consumer<MidiMessage>,
    scheduler: MidiScheduler,
    recorder: RingRecorder,
    snapshot: Snapshot,
    looper: LoopState,
    trigger: TriggerController,
    envelopes: Envelopes,
    mixer: Mixer,
    /// Pre-allocated loop output for one block
    loop_buffer: AudioBuffer,
    /// User sample waiting for the next start
    staged_sample: Option<Shared<UserSample>>,
    /// Snapshot changed this block; its overview needs a rescan
    overview_dirty: bool,
}

impl LoopEngine {
    /// Create an unprepared engine around its shared state and queue consumers
    pub fn new(
        params: Arc<LoopParams>,
        telemetry: Arc<LoopTelemetry>,
        commands: rtrb::Consumer<EngineCommand>,
        keyboard: rtrb::Consumer<MidiMessage>,
    ) -> Self {
        Self {
            config: None,
            params,
            telemetry,
            commands,
            keyboard,
            scheduler: MidiScheduler::new(),
            recorder: RingRecorder::new(),
            snapshot: Snapshot::new(),
            looper: LoopState::new(),
            trigger: TriggerController::new(),
            envelopes: Envelopes::new(),
            mixer: Mixer::new(),
            loop_buffer: AudioBuffer::default(),
            staged_sample: None,
            overview_dirty: false,
        }
    }

    /// Size every buffer for a format and reset the loop
    ///
    /// Allocates. Must not run concurrently with [`Self::process`]. A rejected
    /// config leaves the previous preparation untouched. A staged user sample
    /// is refitted to the new capacity and channel count.
    pub fn prepare(&mut self, config: &EngineConfig) -> Result<(), ConfigError> {
        let layout = config.validate()?;
        let channels = layout.channels();

        // Samples still queued were fitted to the old format
        self.process_commands();

        self.recorder.prepare(config.sample_rate, channels);
        let capacity = self.recorder.capacity();
        self.snapshot.prepare(capacity, channels);
        if let Some(refit) = self
            .staged_sample
            .as_ref()
            .and_then(|sample| sample.refit(capacity, channels))
        {
            self.staged_sample = Some(Shared::new(&gc_handle(), refit));
        }
        self.loop_buffer = AudioBuffer::silence(channels, config.max_block_size);
        self.looper.prepare(config.sample_rate);
        self.looper.set_source_len(capacity);
        self.overview_dirty = false;
        self.trigger.prepare(config.sample_rate);
        self.envelopes.prepare(config.sample_rate);
        self.config = Some(*config);

        self.telemetry
            .publish_format(config.sample_rate, capacity, channels);
        self.telemetry.publish_loop(1, 1, false);
        self.telemetry.publish_snapshot(0, false);
        self.telemetry.publish_recorder_pos(0);
        self.telemetry.recorder_overview.clear();
        self.telemetry.snapshot_overview.clear();

        log::info!(
            "[ENGINE] Prepared: {} Hz, {:?}, max block {}, capacity {} samples, crossfade {} samples",
            config.sample_rate,
            layout,
            config.max_block_size,
            capacity,
            self.looper.crossfade_len()
        );
        Ok(())
    }

    /// Check if [`Self::prepare`] has succeeded
    pub fn is_prepared(&self) -> bool {
        self.config.is_some()
    }

    pub fn config(&self) -> Option<&EngineConfig> {
        self.config.as_ref()
    }

    /// Shared telemetry (same `Arc` the controller reads)
    pub fn telemetry(&self) -> &Arc<LoopTelemetry> {
        &self.telemetry
    }

    /// Process one block in place (real-time safe)
    ///
    /// `io` holds the input on entry and the output on return. Blocks longer
    /// than the prepared maximum are processed in sub-blocks, with `midi`
    /// applied at the start of the first one. An unprepared engine leaves
    /// `io` untouched.
    pub fn process(&mut self, io: &mut AudioBuffer, midi: &[TimedMidiEvent]) {
        let Some(config) = self.config else {
            return;
        };
        let total = io.len();
        let mut offset = 0;
        let mut host_midi = Some(midi);

        while offset < total {
            let len = (total - offset).min(config.max_block_size);
            self.process_block(io, offset, len, host_midi.take(), &config);
            offset += len;
        }
    }

    fn process_block(
        &mut self,
        io: &mut AudioBuffer,
        offset: usize,
        len: usize,
        midi: Option<&[TimedMidiEvent]>,
        config: &EngineConfig,
    ) {
        self.process_commands();

        let params = self.params.values();
        let sample_rate = config.sample_rate as f64;
        let latency = (params.latency_comp_ms as f64 / 1000.0 * sample_rate).round() as usize;

        self.record(io, offset, len);

        if let Some(host) = midi {
            self.handle_midi(host, len, &params, latency);
        }

        let pending = self.trigger.pending_length(
            &params,
            len,
            sample_rate,
            self.recorder.capacity(),
        );
        self.looper.set_pending(pending);

        match decide(
            params.hold,
            self.trigger.notes_down(),
            self.looper.is_active(),
            self.envelopes.is_releasing(),
        ) {
            TriggerAction::Start => self.start_loop(&params, latency, pending),
            TriggerAction::Release => self.envelopes.release(params.release_ms),
            TriggerAction::Continue => {}
        }

        if self.overview_dirty {
            self.snapshot
                .update_overview(&self.telemetry.snapshot_overview);
            self.overview_dirty = false;
        }

        self.looper.render(
            &self.snapshot,
            &mut self.loop_buffer,
            len,
            params.playback_speed as f64,
        );

        let meters = self.mixer.process(
            io,
            offset,
            len,
            &self.loop_buffer,
            &mut self.envelopes,
            MixSettings {
                pass_gain: params.pass_gain,
                loop_gain: params.loop_gain,
                mix: params.mix,
            },
        );

        if self.looper.is_active() && self.envelopes.is_silent() {
            self.looper.stop();
        }

        self.telemetry.publish_loop(
            self.looper.current_len(),
            self.looper.pending_len(),
            self.looper.is_active(),
        );
        self.telemetry.publish_levels(
            self.envelopes.loop_level(),
            self.envelopes.passthrough_level(),
            meters.passthrough,
            meters.loop_path,
        );
    }

    /// Drain the command queue (real-time safe)
    ///
    /// Replaced samples are dropped here; `Shared` defers the free to the
    /// collector thread.
    fn process_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                EngineCommand::LoadUserSample(sample) => self.staged_sample = Some(sample),
                EngineCommand::ClearUserSample => self.staged_sample = None,
            }
        }
    }

    /// Write input into the ring and refresh the overview bins it touched
    fn record(&mut self, io: &AudioBuffer, offset: usize, len: usize) {
        let capacity = self.recorder.capacity();
        if capacity == 0 || len == 0 {
            return;
        }
        let start = self.recorder.write_pos();
        self.recorder.write(io, offset, len);
        let end = self.recorder.write_pos();
        self.telemetry.publish_recorder_pos(end);

        let overview = &self.telemetry.recorder_overview;
        let bins = overview.len();
        let first = overview.bin_of(start, capacity);
        let last = overview.bin_of((start + len - 1) % capacity, capacity);
        let touched = if len >= capacity {
            bins
        } else {
            (last + bins - first) % bins + 1
        };
        let recorder = &self.recorder;
        for k in 0..touched {
            let bin = (first + k) % bins;
            overview.update_bin(bin, (0..recorder.num_channels()).map(|ch| recorder.channel(ch)));
        }
    }

    fn handle_midi(&mut self, host: &[TimedMidiEvent], len: usize, params: &ParamValues, latency: usize) {
        let count = self.scheduler.collect(host, &mut self.keyboard, len);
        for i in 0..count {
            let message = self.scheduler.message(i);
            let is_note_on = self.trigger.handle_midi(message, params.midi_enabled);
            if !is_note_on || !self.looper.is_active() {
                continue;
            }

            if params.midi_enabled && !params.hold && !params.use_user_sample {
                self.take_snapshot(latency);
                self.looper.restart_at_boundary();
            }
            self.envelopes.recover();
        }
    }

    fn start_loop(&mut self, params: &ParamValues, latency: usize, pending: usize) {
        let staged = if params.use_user_sample {
            self.staged_sample.clone()
        } else {
            None
        };
        match staged {
            Some(sample) => {
                self.snapshot.substitute(sample);
                self.snapshot_changed();
            }
            None => self.take_snapshot(latency),
        }
        self.looper.set_pending(pending);
        self.looper.start();
        self.envelopes.start();
    }

    fn take_snapshot(&mut self, latency: usize) {
        self.snapshot.capture(&self.recorder, latency);
        self.snapshot_changed();
    }

    /// Limit loop lengths to the new source and publish it
    fn snapshot_changed(&mut self) {
        self.looper.set_source_len(self.snapshot.len());
        self.overview_dirty = true;
        self.telemetry.publish_snapshot(
            self.snapshot.end(),
            self.snapshot.source() == SnapshotSource::UserSample,
        );
    }
}

/// Create a prepared engine and the controller that drives it
///
/// The engine goes to the audio thread; the controller stays on the
/// control thread.
pub fn create_engine(config: &EngineConfig) -> Result<(LoopEngine, EngineController), ConfigError> {
    let params = Arc::new(LoopParams::new());
    let telemetry = Arc::new(LoopTelemetry::new());
    let (command_tx, command_rx) = command_channel();
    let (keyboard_tx, keyboard_rx) = keyboard_channel();

    let mut engine = LoopEngine::new(params.clone(), telemetry.clone(), command_rx, keyboard_rx);
    engine.prepare(config)?;

    let controller = EngineController::new(params, telemetry, command_tx, keyboard_tx);
    Ok((engine, controller))
}
