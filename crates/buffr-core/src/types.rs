//! Common types for Buffr
//!
//! This module contains the fundamental audio types used throughout the
//! engine: the planar sample buffer and the channel layouts the engine accepts.

use serde::{Deserialize, Serialize};

/// Default sample rate (48kHz - standard professional audio rate)
/// This is the default; the actual rate comes from the audio device at runtime.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Maximum number of channels per bus (mono or stereo)
pub const MAX_CHANNELS: usize = 2;

/// Audio sample type (32-bit float for processing)
pub type Sample = f32;

/// Channel layout of the main input/output bus
///
/// The engine only runs with matching input and output layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelLayout {
    Mono,
    #[default]
    Stereo,
}

impl ChannelLayout {
    /// Number of channels in this layout
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Layout for a channel count, if supported
    pub fn from_channels(channels: usize) -> Option<Self> {
        match channels {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

/// Planar (non-interleaved) multi-channel sample buffer
///
/// Every channel has the same length. Buffers used on the audio thread are
/// allocated once with their maximum size and then resized with
/// [`AudioBuffer::set_len_from_capacity`], which never allocates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<Sample>>,
}

impl AudioBuffer {
    /// Create a new buffer filled with silence
    pub fn silence(num_channels: usize, len: usize) -> Self {
        Self {
            channels: (0..num_channels).map(|_| vec![0.0; len]).collect(),
        }
    }

    /// Create a buffer from per-channel sample vectors
    ///
    /// All channels are truncated to the shortest one.
    pub fn from_channels(mut channels: Vec<Vec<Sample>>) -> Self {
        let len = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in &mut channels {
            channel.truncate(len);
        }
        Self { channels }
    }

    /// Number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of sample frames in the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-only view of one channel
    #[inline]
    pub fn channel(&self, ch: usize) -> &[Sample] {
        &self.channels[ch]
    }

    /// Mutable view of one channel
    #[inline]
    pub fn channel_mut(&mut self, ch: usize) -> &mut [Sample] {
        &mut self.channels[ch]
    }

    /// Set the working length of a pre-allocated buffer (real-time safe)
    ///
    /// Newly exposed samples are silent. Growing past the allocated capacity
    /// would allocate, so callers must size the buffer up front.
    #[inline]
    pub fn set_len_from_capacity(&mut self, new_len: usize) {
        for channel in &mut self.channels {
            debug_assert!(
                new_len <= channel.capacity(),
                "set_len_from_capacity called with len > capacity"
            );
            if new_len > channel.len() {
                channel.resize(new_len, 0.0);
            } else {
                channel.truncate(new_len);
            }
        }
    }

    /// Write to an interleaved device buffer (real-time safe)
    ///
    /// A mono buffer is duplicated onto the first two device channels; any
    /// further device channels are filled with silence.
    pub fn write_interleaved(&self, data: &mut [Sample], dest_channels: usize) {
        let dest_channels = dest_channels.max(1);
        let num_channels = self.num_channels();
        for (i, frame) in data.chunks_mut(dest_channels).enumerate() {
            for (ch, out) in frame.iter_mut().enumerate() {
                let src_ch = if ch < num_channels {
                    Some(ch)
                } else if num_channels == 1 && ch < MAX_CHANNELS {
                    Some(0)
                } else {
                    None
                };
                *out = src_ch
                    .and_then(|c| self.channels[c].get(i).copied())
                    .unwrap_or(0.0);
            }
        }
    }
}
