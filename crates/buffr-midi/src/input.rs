//! MIDI input handling
//!
//! Receives raw MIDI bytes from the midir callback, parses them with midly,
//! and forwards note and pitch-bend events over a flume channel.

use flume::Sender;
use midir::MidiInputConnection;
use midly::live::LiveEvent;
use midly::MidiMessage;

use crate::connection::{MidiConnection, MidiConnectionError};

/// Centre position of the 14-bit pitch wheel
pub const PITCH_WHEEL_CENTER: u16 = 8192;

/// Parsed MIDI input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiInputEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    /// 14-bit wheel position, 0..=16383 with [`PITCH_WHEEL_CENTER`] at rest
    PitchBend { channel: u8, value: u16 },
}

impl MidiInputEvent {
    /// Parse raw MIDI bytes into an event
    ///
    /// Note On with velocity 0 is treated as Note Off. Everything other than
    /// notes and pitch bend is ignored.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let LiveEvent::Midi { channel, message } = LiveEvent::parse(data).ok()? else {
            return None;
        };
        let channel = channel.as_int();

        match message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => Some(Self::NoteOff {
                channel,
                note: key.as_int(),
            }),
            MidiMessage::NoteOn { key, vel } => Some(Self::NoteOn {
                channel,
                note: key.as_int(),
                velocity: vel.as_int(),
            }),
            MidiMessage::NoteOff { key, .. } => Some(Self::NoteOff {
                channel,
                note: key.as_int(),
            }),
            MidiMessage::PitchBend { bend } => Some(Self::PitchBend {
                channel,
                value: bend.0.as_int(),
            }),
            _ => None,
        }
    }

    pub fn channel(&self) -> u8 {
        match self {
            Self::NoteOn { channel, .. }
            | Self::NoteOff { channel, .. }
            | Self::PitchBend { channel, .. } => *channel,
        }
    }
}

/// MIDI input handler
///
/// Owns the midir connection; dropping it disconnects the port.
pub struct MidiInputHandler {
    _connection: MidiInputConnection<Sender<MidiInputEvent>>,
    port_name: String,
}

impl MidiInputHandler {
    /// Connect to the first input port matching `port_match`
    pub fn connect(
        port_match: &str,
        event_tx: Sender<MidiInputEvent>,
    ) -> Result<Self, MidiConnectionError> {
        let (midi_in, port, port_name) = MidiConnection::find_input_port(port_match)?;

        let connection = midi_in
            .connect(&port, "buffr-midi-input", Self::midi_callback, event_tx)
            .map_err(|e| MidiConnectionError::ConnectionError(e.to_string()))?;

        log::info!("MIDI: Input handler connected to {}", port_name);

        Ok(Self {
            _connection: connection,
            port_name,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Called from the MIDI driver thread; must not block
    fn midi_callback(_timestamp: u64, data: &[u8], event_tx: &mut Sender<MidiInputEvent>) {
        forward(data, event_tx);
    }
}

/// Parse and forward one message; returns whether an event was sent
fn forward(data: &[u8], event_tx: &Sender<MidiInputEvent>) -> bool {
    let Some(event) = MidiInputEvent::parse(data) else {
        return false;
    };
    if event_tx.try_send(event).is_err() {
        log::warn!("MIDI: Event channel full, dropping {:?}", event);
        return false;
    }
    true
}
