//! Always-on ring recorder
//!
//! Every block of live input is written into a fixed-capacity ring per
//! channel, before any muting or mixing. The ring is never paused; snapshots
//! copy out of it (see [`super::Snapshot::capture`]).
//!
//! Capacity is `ceil(sample_rate * RECORD_WINDOW_SECONDS)` samples per channel
//! and is only changed (and cleared) by [`RingRecorder::prepare`].

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::{AudioBuffer, Sample};

/// Length of recorded history kept in the ring (seconds)
pub const RECORD_WINDOW_SECONDS: f64 = 4.0;

/// Ring capacity in samples for a sample rate
pub fn capacity_for(sample_rate: u32) -> usize {
    (sample_rate as f64 * RECORD_WINDOW_SECONDS).ceil() as usize
}

/// Fixed-capacity circular recorder
pub struct RingRecorder {
    channels: Vec<Vec<Sample>>,
    /// Next sample to be overwritten
    write_pos: AtomicUsize,
}

impl RingRecorder {
    /// Create an empty recorder (capacity 0 until prepared)
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            write_pos: AtomicUsize::new(0),
        }
    }

    /// Resize and clear for a new sample rate / channel count
    ///
    /// Allocates; never call from the block-processing path.
    pub fn prepare(&mut self, sample_rate: u32, num_channels: usize) {
        let capacity = capacity_for(sample_rate);
        self.channels = (0..num_channels.max(1))
            .map(|_| vec![0.0; capacity])
            .collect();
        self.write_pos.store(0, Ordering::Release);
    }

    /// Samples per channel
    #[inline]
    pub fn capacity(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Current write cursor (atomic load)
    #[inline]
    pub fn write_pos(&self) -> usize {
        self.write_pos.load(Ordering::Acquire)
    }

    /// Raw ring contents of one channel (not time-ordered)
    #[inline]
    pub fn channel(&self, ch: usize) -> &[Sample] {
        &self.channels[ch]
    }

    /// Append `len` frames of `input` starting at frame `offset` (real-time safe)
    ///
    /// Only `min(input, ring)` channels are written; the cursor advances by
    /// `len` modulo capacity either way.
    pub fn write(&mut self, input: &AudioBuffer, offset: usize, len: usize) {
        let capacity = self.capacity();
        if capacity == 0 || len == 0 {
            return;
        }

        let start = self.write_pos();
        let num_channels = self.channels.len().min(input.num_channels());
        let end_frame = (offset + len).min(input.len());

        for ch in 0..num_channels {
            let src = &input.channel(ch)[offset.min(end_frame)..end_frame];
            let ring = &mut self.channels[ch];
            let mut w = start;
            let mut remaining = src;
            while !remaining.is_empty() {
                let n = remaining.len().min(capacity - w);
                ring[w..w + n].copy_from_slice(&remaining[..n]);
                remaining = &remaining[n..];
                w = (w + n) % capacity;
            }
        }

        self.write_pos
            .store((start + len) % capacity, Ordering::Release);
    }

    /// Clear the ring contents and reset the cursor
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
        self.write_pos.store(0, Ordering::Release);
    }
}

impl Default for RingRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_follows_sample_rate() {
        assert_eq!(capacity_for(48000), 192_000);
        assert_eq!(capacity_for(44100), 176_400);
        assert_eq!(capacity_for(22051), 88_204);
    }

    #[test]
    fn test_prepare_clears() {
        let mut recorder = RingRecorder::new();
        recorder.prepare(1000, 2);
        let input = AudioBuffer::from_channels(vec![vec![0.5; 100], vec![-0.5; 100]]);
        recorder.write(&input, 0, 100);
        assert_eq!(recorder.write_pos(), 100);

        recorder.prepare(2000, 2);
        assert_eq!(recorder.capacity(), 8000);
        assert_eq!(recorder.write_pos(), 0);
        assert!(recorder.channel(0).iter().all(|&s| s == 0.0));
        assert!(recorder.channel(1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_write_wraps() {
        let mut recorder = RingRecorder::new();
        recorder.prepare(2, 1); // capacity 8
        let first = AudioBuffer::from_channels(vec![(0..6).map(|i| i as f32).collect()]);
        recorder.write(&first, 0, 6);
        let second = AudioBuffer::from_channels(vec![(6..10).map(|i| i as f32).collect()]);
        recorder.write(&second, 0, 4);

        assert_eq!(recorder.write_pos(), 2);
        assert_eq!(recorder.channel(0), &[8.0, 9.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_write_only_shared_channels() {
        let mut recorder = RingRecorder::new();
        recorder.prepare(1, 2); // capacity 4, stereo
        let mono = AudioBuffer::from_channels(vec![vec![1.0, 2.0]]);
        recorder.write(&mono, 0, 2);
        assert_eq!(recorder.channel(0), &[1.0, 2.0, 0.0, 0.0]);
        assert_eq!(recorder.channel(1), &[0.0; 4]);
        assert_eq!(recorder.write_pos(), 2);
    }

    #[test]
    fn test_write_sub_range() {
        let mut recorder = RingRecorder::new();
        recorder.prepare(2, 1);
        let input = AudioBuffer::from_channels(vec![vec![1.0, 2.0, 3.0, 4.0]]);
        recorder.write(&input, 2, 2);
        assert_eq!(&recorder.channel(0)[..2], &[3.0, 4.0]);
        assert_eq!(recorder.write_pos(), 2);
    }
}
