//! Lock-free engine state for UI access
//!
//! The audio thread publishes loop state, envelope values, meters and
//! waveform overviews here once per block. Any thread can read them without
//! locking. All operations use `Ordering::Relaxed` since readers only need
//! visibility, not synchronization with other memory operations.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Number of peak bins in each waveform overview
pub const OVERVIEW_BINS: usize = 512;

#[inline]
fn load_f32(atomic: &AtomicU32) -> f32 {
    f32::from_bits(atomic.load(Ordering::Relaxed))
}

#[inline]
fn store_f32(atomic: &AtomicU32, value: f32) {
    atomic.store(value.to_bits(), Ordering::Relaxed);
}

/// Peak overview of a buffer for waveform display
///
/// Each bin holds the absolute peak (over all channels) of an equal share of
/// the underlying buffer.
pub struct WaveformOverview {
    bins: Vec<AtomicU32>,
}

impl WaveformOverview {
    pub fn new(num_bins: usize) -> Self {
        Self {
            bins: (0..num_bins.max(1)).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// Number of bins
    #[inline]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Peak of one bin (lock-free)
    #[inline]
    pub fn peak(&self, bin: usize) -> f32 {
        self.bins.get(bin).map_or(0.0, load_f32)
    }

    /// Copy all bins (allocates, UI thread only)
    pub fn peaks(&self) -> Vec<f32> {
        self.bins.iter().map(load_f32).collect()
    }

    /// Reset every bin to silence
    pub fn clear(&self) {
        for bin in &self.bins {
            store_f32(bin, 0.0);
        }
    }

    /// Sample range `[start, end)` covered by `bin` for a buffer of `len` samples
    #[inline]
    pub fn bin_range(&self, bin: usize, len: usize) -> (usize, usize) {
        let n = self.bins.len();
        (bin * len / n, (bin + 1) * len / n)
    }

    /// Bin containing sample `index` of a buffer of `len` samples
    #[inline]
    pub fn bin_of(&self, index: usize, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (index * self.bins.len() / len).min(self.bins.len() - 1)
    }

    /// Recompute one bin from per-channel sample data (real-time safe)
    pub fn update_bin<'a>(&self, bin: usize, channels: impl Iterator<Item = &'a [f32]>) {
        let Some(slot) = self.bins.get(bin) else {
            return;
        };
        let mut peak = 0.0f32;
        let mut len = None;
        for channel in channels {
            let channel_len = *len.get_or_insert(channel.len());
            let (start, end) = self.bin_range(bin, channel_len);
            for &s in &channel[start..end.min(channel.len())] {
                peak = peak.max(s.abs());
            }
        }
        store_f32(slot, peak);
    }
}

/// Lock-free loop engine state for UI access
pub struct LoopTelemetry {
    current_loop_samples: AtomicU64,
    pending_loop_samples: AtomicU64,
    looping: AtomicBool,
    loop_envelope: AtomicU32,
    passthrough_level: AtomicU32,
    meter_passthrough: AtomicU32,
    meter_loop: AtomicU32,
    recorder_write_pos: AtomicU64,
    snapshot_end: AtomicU64,
    snapshot_from_user_sample: AtomicBool,
    sample_rate: AtomicU32,
    capacity: AtomicU64,
    channels: AtomicU32,
    /// Peaks of the always-on recorder ring
    pub recorder_overview: WaveformOverview,
    /// Peaks of the frozen loop source
    pub snapshot_overview: WaveformOverview,
}

impl LoopTelemetry {
    pub fn new() -> Self {
        Self {
            current_loop_samples: AtomicU64::new(1),
            pending_loop_samples: AtomicU64::new(1),
            looping: AtomicBool::new(false),
            loop_envelope: AtomicU32::new(0),
            passthrough_level: AtomicU32::new(1.0f32.to_bits()),
            meter_passthrough: AtomicU32::new(0),
            meter_loop: AtomicU32::new(0),
            recorder_write_pos: AtomicU64::new(0),
            snapshot_end: AtomicU64::new(0),
            snapshot_from_user_sample: AtomicBool::new(false),
            sample_rate: AtomicU32::new(crate::types::DEFAULT_SAMPLE_RATE),
            capacity: AtomicU64::new(0),
            channels: AtomicU32::new(0),
            recorder_overview: WaveformOverview::new(OVERVIEW_BINS),
            snapshot_overview: WaveformOverview::new(OVERVIEW_BINS),
        }
    }

    fn samples_to_ms(&self, samples: u64) -> f32 {
        let sr = self.sample_rate().max(1);
        samples as f32 / sr as f32 * 1000.0
    }

    /// Loop length currently playing, in samples
    #[inline]
    pub fn current_loop_samples(&self) -> u64 {
        self.current_loop_samples.load(Ordering::Relaxed)
    }

    /// Loop length that will be committed at the next boundary, in samples
    #[inline]
    pub fn pending_loop_samples(&self) -> u64 {
        self.pending_loop_samples.load(Ordering::Relaxed)
    }

    pub fn current_loop_ms(&self) -> f32 {
        self.samples_to_ms(self.current_loop_samples())
    }

    pub fn pending_loop_ms(&self) -> f32 {
        self.samples_to_ms(self.pending_loop_samples())
    }

    /// Check if the loop is synthesizing (including its release tail)
    #[inline]
    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Relaxed)
    }

    /// Loop-presence envelope value (0 = silent loop, 1 = full loop)
    #[inline]
    pub fn loop_envelope(&self) -> f32 {
        load_f32(&self.loop_envelope)
    }

    /// Passthrough gain after muting (1 = full passthrough, 0 = muted)
    #[inline]
    pub fn passthrough_level(&self) -> f32 {
        load_f32(&self.passthrough_level)
    }

    /// RMS of the muted passthrough path over the last block
    #[inline]
    pub fn meter_passthrough(&self) -> f32 {
        load_f32(&self.meter_passthrough)
    }

    /// RMS of the loop path over the last block
    #[inline]
    pub fn meter_loop(&self) -> f32 {
        load_f32(&self.meter_loop)
    }

    #[inline]
    pub fn recorder_write_pos(&self) -> u64 {
        self.recorder_write_pos.load(Ordering::Relaxed)
    }

    /// Index one past the most recent sample of the active snapshot
    #[inline]
    pub fn snapshot_end(&self) -> u64 {
        self.snapshot_end.load(Ordering::Relaxed)
    }

    /// Check if the active snapshot is the loaded user sample
    #[inline]
    pub fn snapshot_from_user_sample(&self) -> bool {
        self.snapshot_from_user_sample.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    /// Recorder capacity in samples per channel (0 before prepare)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed) as usize
    }

    /// Channel count of the prepared layout (0 before prepare)
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels.load(Ordering::Relaxed) as usize
    }

    // ─────────────────────────────────────────────────────────────
    // Audio thread writers
    // ─────────────────────────────────────────────────────────────

    pub(crate) fn publish_format(&self, sample_rate: u32, capacity: usize, channels: usize) {
        self.sample_rate.store(sample_rate, Ordering::Relaxed);
        self.capacity.store(capacity as u64, Ordering::Relaxed);
        self.channels.store(channels as u32, Ordering::Relaxed);
    }

    pub(crate) fn publish_loop(&self, current: usize, pending: usize, looping: bool) {
        self.current_loop_samples
            .store(current as u64, Ordering::Relaxed);
        self.pending_loop_samples
            .store(pending as u64, Ordering::Relaxed);
        self.looping.store(looping, Ordering::Relaxed);
    }

    pub(crate) fn publish_levels(
        &self,
        loop_envelope: f32,
        passthrough_level: f32,
        meter_passthrough: f32,
        meter_loop: f32,
    ) {
        store_f32(&self.loop_envelope, loop_envelope);
        store_f32(&self.passthrough_level, passthrough_level);
        store_f32(&self.meter_passthrough, meter_passthrough);
        store_f32(&self.meter_loop, meter_loop);
    }

    pub(crate) fn publish_recorder_pos(&self, write_pos: usize) {
        self.recorder_write_pos
            .store(write_pos as u64, Ordering::Relaxed);
    }

    pub(crate) fn publish_snapshot(&self, end: usize, from_user_sample: bool) {
        self.snapshot_end.store(end as u64, Ordering::Relaxed);
        self.snapshot_from_user_sample
            .store(from_user_sample, Ordering::Relaxed);
    }
}

impl Default for LoopTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_ms_conversion() {
        let telemetry = LoopTelemetry::new();
        telemetry.publish_format(48000, 192_000, 2);
        telemetry.publish_loop(4800, 24000, true);
        assert!((telemetry.current_loop_ms() - 100.0).abs() < 1e-4);
        assert!((telemetry.pending_loop_ms() - 500.0).abs() < 1e-4);
        assert!(telemetry.is_looping());
        assert_eq!(telemetry.capacity(), 192_000);
        assert_eq!(telemetry.channels(), 2);
    }

    #[test]
    fn test_overview_bins() {
        let overview = WaveformOverview::new(4);
        assert_eq!(overview.bin_range(0, 100), (0, 25));
        assert_eq!(overview.bin_range(3, 100), (75, 100));
        assert_eq!(overview.bin_of(99, 100), 3);
        assert_eq!(overview.bin_of(25, 100), 1);

        let mut left = vec![0.0f32; 100];
        let right = vec![0.0f32; 100];
        left[30] = -0.8;
        overview.update_bin(1, [left.as_slice(), right.as_slice()].into_iter());
        assert_eq!(overview.peak(1), 0.8);
        assert_eq!(overview.peak(0), 0.0);

        overview.clear();
        assert!(overview.peaks().iter().all(|&p| p == 0.0));
    }
}
