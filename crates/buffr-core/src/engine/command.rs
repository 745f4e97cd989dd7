//! Lock-free command queue from the control thread to the audio thread
//!
//! Parameters travel through atomics and MIDI through its own queue; this
//! queue carries the operations that hand buffers over, so the audio thread
//! never allocates or frees them:
//!
//! - Staging a decoded user sample (a `basedrop::Shared` handle, so the last
//!   drop on the audio thread defers the free to the collector thread)
//! - Clearing the staged sample
//!
//! ```ignore
//! // Control thread
//! let sample = Shared::new(&gc_handle(), user_sample);
//! tx.push(EngineCommand::LoadUserSample(sample))?;
//!
//! // Audio thread, at the start of each block
//! while let Ok(cmd) = rx.pop() { ... }
//! ```

use basedrop::Shared;

use crate::audio_file::UserSample;

/// Commands sent from the control thread to the audio thread
pub enum EngineCommand {
    /// Stage a user sample; it becomes the loop source at the next start
    LoadUserSample(Shared<UserSample>),
    /// Drop the staged user sample
    ClearUserSample,
}

impl std::fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineCommand::LoadUserSample(sample) => f
                .debug_tuple("LoadUserSample")
                .field(&sample.name())
                .finish(),
            EngineCommand::ClearUserSample => write!(f, "ClearUserSample"),
        }
    }
}

/// Capacity of the command queue
///
/// Commands are rare (one per file load), so a small queue suffices.
pub const COMMAND_QUEUE_CAPACITY: usize = 16;

/// Create a new command channel (producer/consumer pair)
///
/// The producer belongs to the control thread, the consumer to the audio thread.
pub fn command_channel() -> (rtrb::Producer<EngineCommand>, rtrb::Consumer<EngineCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}
