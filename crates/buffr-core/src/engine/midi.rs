//! MIDI events consumed by the engine
//!
//! Two sources feed the engine each block:
//! - **Host MIDI**: timestamped events passed straight into `process()`
//! - **Keyboard MIDI**: events from the control thread (on-screen keyboard,
//!   hardware MIDI bridge), queued on a lock-free ringbuffer in arrival order
//!
//! [`MidiScheduler`] drains the queue and merges both into a single list
//! ordered by block offset. Keyboard events land at offset 0, ahead of host
//! events at the same offset, since they arrived before the block started.

/// Channel voice messages the engine reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    /// 14-bit pitch wheel value (0..=16383, 8192 = centre)
    PitchWheel { channel: u8, value: u16 },
}

/// A MIDI message at a sample offset within the current block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedMidiEvent {
    pub offset: u32,
    pub message: MidiMessage,
}

impl TimedMidiEvent {
    pub fn new(offset: u32, message: MidiMessage) -> Self {
        Self { offset, message }
    }
}

/// Capacity of the keyboard MIDI queue
pub const KEYBOARD_QUEUE_CAPACITY: usize = 256;

/// Maximum host events merged per block; extras are dropped
pub const MAX_HOST_EVENTS_PER_BLOCK: usize = 512;

/// Create the keyboard MIDI queue (producer/consumer pair)
///
/// The producer belongs to the control thread, the consumer to the audio thread.
pub fn keyboard_channel() -> (rtrb::Producer<MidiMessage>, rtrb::Consumer<MidiMessage>) {
    rtrb::RingBuffer::new(KEYBOARD_QUEUE_CAPACITY)
}

#[derive(Debug, Clone, Copy)]
struct ScheduledEvent {
    offset: u32,
    seq: u32,
    message: MidiMessage,
}

/// Per-block MIDI merger with pre-allocated scratch space
pub struct MidiScheduler {
    scratch: Vec<ScheduledEvent>,
}

impl MidiScheduler {
    pub fn new() -> Self {
        Self {
            scratch: Vec::with_capacity(KEYBOARD_QUEUE_CAPACITY + MAX_HOST_EVENTS_PER_BLOCK),
        }
    }

    /// Drain the keyboard queue and merge with host events (real-time safe)
    ///
    /// Host offsets are clamped into `0..block_len`. Returns the number of
    /// merged events, readable in `(offset, arrival)` order via [`Self::message`].
    pub fn collect(
        &mut self,
        host: &[TimedMidiEvent],
        keyboard: &mut rtrb::Consumer<MidiMessage>,
        block_len: usize,
    ) -> usize {
        self.scratch.clear();
        let capacity = self.scratch.capacity();
        let last = block_len.saturating_sub(1) as u32;
        let mut seq = 0u32;

        while self.scratch.len() < capacity {
            let Ok(message) = keyboard.pop() else {
                break;
            };
            self.scratch.push(ScheduledEvent {
                offset: 0,
                seq,
                message,
            });
            seq += 1;
        }

        for event in host {
            if self.scratch.len() >= capacity {
                break;
            }
            self.scratch.push(ScheduledEvent {
                offset: event.offset.min(last),
                seq,
                message: event.message,
            });
            seq += 1;
        }

        // Keys are unique, so the unstable (non-allocating) sort is deterministic
        self.scratch.sort_unstable_by_key(|e| (e.offset, e.seq));
        self.scratch.len()
    }

    /// The `index`-th merged message of the last [`Self::collect`]
    #[inline]
    pub fn message(&self, index: usize) -> MidiMessage {
        self.scratch[index].message
    }

    /// All merged messages of the last [`Self::collect`], in order
    pub fn messages(&self) -> impl Iterator<Item = MidiMessage> + '_ {
        self.scratch.iter().map(|e| e.message)
    }
}

impl Default for MidiScheduler {
    fn default() -> Self {
        Self::new()
    }
}
