//! Host session: applies control commands and hardware MIDI to the engine

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use buffr_core::config::{read_state_file, write_state_file};
use buffr_core::engine::{EngineController, MidiMessage, ParamId, ParamKind, ParamValues};
use buffr_midi::MidiInputEvent;

use crate::control::{ControlCommand, HELP};

pub struct Session {
    controller: EngineController,
    state_path: Option<PathBuf>,
}

impl Session {
    pub fn new(controller: EngineController, state_path: Option<PathBuf>) -> Self {
        Self {
            controller,
            state_path,
        }
    }

    pub fn controller(&self) -> &EngineController {
        &self.controller
    }

    pub fn apply_params(&self, values: &ParamValues) {
        self.controller.apply_params(&values.clamped());
    }

    /// Forward a hardware MIDI event to the engine's keyboard queue
    pub fn handle_midi(&mut self, event: MidiInputEvent) -> Result<()> {
        let message = match event {
            MidiInputEvent::NoteOn {
                channel,
                note,
                velocity,
            } => MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            },
            MidiInputEvent::NoteOff { channel, note } => MidiMessage::NoteOff { channel, note },
            MidiInputEvent::PitchBend { channel, value } => {
                MidiMessage::PitchWheel { channel, value }
            }
        };
        self.controller.send_midi(message).map_err(queue_full)
    }

    /// Run one command; returns the text to show the user
    pub fn execute(&mut self, command: &ControlCommand) -> Result<String> {
        match command {
            ControlCommand::NoteOn { note, velocity } => {
                self.controller.note_on(*note, *velocity).map_err(queue_full)?;
                Ok(String::new())
            }
            ControlCommand::NoteOff { note } => {
                self.controller.note_off(*note).map_err(queue_full)?;
                Ok(String::new())
            }
            ControlCommand::Bend(value) => {
                self.controller.pitch_wheel(*value).map_err(queue_full)?;
                Ok(String::new())
            }
            ControlCommand::Set { id, value } => {
                self.controller.set_param(*id, *value);
                Ok(self.describe_param(*id))
            }
            ControlCommand::Get(id) => Ok(self.describe_param(*id)),
            ControlCommand::Params => Ok(ParamId::ALL
                .iter()
                .map(|id| self.describe_param(*id))
                .collect::<Vec<_>>()
                .join("\n")),
            ControlCommand::Load(path) => {
                self.controller
                    .load_sample(path)
                    .with_context(|| format!("Failed to load {:?}", path))?;
                let sample = self
                    .controller
                    .user_sample()
                    .ok_or_else(|| anyhow!("Sample was not staged"))?;
                Ok(format!(
                    "loaded {} ({} ch, {} Hz source); 'set useUserSample on' to loop it",
                    sample.name(),
                    sample.num_channels(),
                    sample.source_sample_rate()
                ))
            }
            ControlCommand::Clear => {
                self.controller.clear_user_sample()?;
                Ok("user sample cleared".to_string())
            }
            ControlCommand::Save(path) => {
                let path = self.save(path.as_deref())?;
                Ok(format!("state saved to {}", path.display()))
            }
            ControlCommand::Restore(path) => {
                let path = self.restore(path.as_deref())?;
                Ok(format!("state restored from {}", path.display()))
            }
            ControlCommand::Status => Ok(self.status_line()),
            ControlCommand::Help => Ok(HELP.to_string()),
            ControlCommand::Quit => Ok(String::new()),
        }
    }

    /// Save engine state to `path`, or the configured state path
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = self.resolve_state_path(path)?;
        let bytes = self.controller.save_state()?;
        write_state_file(&path, &bytes)?;
        Ok(path)
    }

    /// Restore engine state from `path`, or the configured state path
    pub fn restore(&mut self, path: Option<&Path>) -> Result<PathBuf> {
        let path = self.resolve_state_path(path)?;
        let bytes = read_state_file(&path)?;
        self.controller
            .restore_state(&bytes)
            .with_context(|| format!("Invalid state file: {:?}", path))?;
        Ok(path)
    }

    fn resolve_state_path(&self, path: Option<&Path>) -> Result<PathBuf> {
        path.map(Path::to_path_buf)
            .or_else(|| self.state_path.clone())
            .ok_or_else(|| anyhow!("No state path configured, pass one explicitly"))
    }

    fn describe_param(&self, id: ParamId) -> String {
        let info = id.info();
        let value = self.controller.param(id);
        let shown = match info.kind {
            ParamKind::Toggle => if value > 0.5 { "on" } else { "off" }.to_string(),
            ParamKind::Integer => format!("{}", value.round() as i32),
            ParamKind::Continuous => format!("{:.3}", value),
        };
        format!(
            "{:<16} {:>9} {:<3} {} [{} .. {}]",
            id.key(),
            shown,
            info.unit,
            info.name,
            info.min,
            info.max
        )
    }

    /// One-line telemetry summary
    pub fn status_line(&self) -> String {
        let t = self.controller.telemetry();
        format!(
            "{} | loop {:.1} ms (pending {:.1} ms) | env {:.2} | pass {:.2} | rms in {:.3} loop {:.3}{}",
            if t.is_looping() { "LOOPING" } else { "idle" },
            t.current_loop_ms(),
            t.pending_loop_ms(),
            t.loop_envelope(),
            t.passthrough_level(),
            t.meter_passthrough(),
            t.meter_loop(),
            if t.snapshot_from_user_sample() { " | user sample" } else { "" }
        )
    }
}

fn queue_full(message: MidiMessage) -> anyhow::Error {
    anyhow!("Keyboard queue full, dropped {:?}", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use buffr_core::engine::{create_engine, EngineConfig, LoopEngine, TimedMidiEvent};
    use buffr_core::{AudioBuffer, ChannelLayout};

    fn session(state_path: Option<PathBuf>) -> (LoopEngine, Session) {
        let (engine, controller) =
            create_engine(&EngineConfig::new(1000, 64, ChannelLayout::Stereo)).unwrap();
        (engine, Session::new(controller, state_path))
    }

    fn run(line: &str, session: &mut Session) -> Result<String> {
        let command = ControlCommand::parse(line)?.ok_or_else(|| anyhow!("blank"))?;
        session.execute(&command)
    }

    #[test]
    fn test_set_and_get() {
        let (_engine, mut session) = session(None);
        let shown = run("set squeeze 250", &mut session).unwrap();
        assert!(shown.starts_with("squeeze"));
        assert!(shown.contains("100.000"));
        assert!(run("get hold", &mut session).unwrap().contains("off"));
        run("set hold on", &mut session).unwrap();
        assert!(session.controller().param_values().hold);
        assert_eq!(run("params", &mut session).unwrap().lines().count(), ParamId::ALL.len());
    }

    #[test]
    fn test_note_starts_loop() {
        let (mut engine, mut session) = session(None);
        run("on 60", &mut session).unwrap();

        let mut io = AudioBuffer::silence(2, 64);
        engine.process(&mut io, &[]);
        assert!(session.controller().telemetry().is_looping());
        assert!(session.status_line().starts_with("LOOPING"));

        session
            .handle_midi(MidiInputEvent::NoteOff { channel: 0, note: 60 })
            .unwrap();
        engine.process(&mut io, &[] as &[TimedMidiEvent]);
        assert!(session.status_line().contains("pending"));
    }

    #[test]
    fn test_save_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("state").join("state.bin");
        let (_engine, mut session) = session(Some(state_path.clone()));

        run("set releaseMs 1200", &mut session).unwrap();
        assert!(run("save", &mut session).unwrap().contains("state.bin"));
        assert!(state_path.exists());

        run("set releaseMs 40", &mut session).unwrap();
        run("restore", &mut session).unwrap();
        assert_eq!(session.controller().param(ParamId::ReleaseMs), 1200.0);

        let other = dir.path().join("other.bin");
        run(&format!("save {}", other.display()), &mut session).unwrap();
        assert!(other.exists());
    }

    #[test]
    fn test_errors_do_not_change_state() {
        let (_engine, mut session) = session(None);
        assert!(run("save", &mut session).is_err());
        assert!(run("restore", &mut session).is_err());
        assert!(run("load /nonexistent/buffr/pad.wav", &mut session).is_err());
        assert!(!session.controller().has_user_sample());
        assert!(run("clear", &mut session).is_ok());
    }
}
