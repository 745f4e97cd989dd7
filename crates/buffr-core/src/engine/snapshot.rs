//! Frozen loop source
//!
//! A snapshot is a linear (non-circular) copy of the recorder's history, with
//! the most recent sample at index `end - 1`. Alternatively, a loaded user
//! sample is substituted wholesale and `end` becomes that sample's length.
//!
//! The snapshot is only replaced on the audio thread at trigger events, so
//! the loop synthesizer always reads a stable buffer.

use basedrop::Shared;

use super::recorder::RingRecorder;
use super::telemetry::WaveformOverview;
use crate::audio_file::UserSample;
use crate::types::Sample;

/// Where the current loop material came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Nothing captured since prepare
    Empty,
    /// Copied from the ring recorder
    Recorder,
    /// The loaded user sample
    UserSample,
}

/// Linear loop source buffer
pub struct Snapshot {
    frozen: Vec<Vec<Sample>>,
    /// User sample currently standing in for `frozen`
    user: Option<Shared<UserSample>>,
    end: usize,
    source: SnapshotSource,
}

impl Snapshot {
    pub fn new() -> Self {
        Self {
            frozen: Vec::new(),
            user: None,
            end: 0,
            source: SnapshotSource::Empty,
        }
    }

    /// Resize and clear to `capacity` samples per channel
    ///
    /// Allocates; never call from the block-processing path.
    pub fn prepare(&mut self, capacity: usize, num_channels: usize) {
        self.frozen = (0..num_channels.max(1))
            .map(|_| vec![0.0; capacity])
            .collect();
        self.user = None;
        self.end = 0;
        self.source = SnapshotSource::Empty;
    }

    /// Freeze the recorder's history, compensated by `latency_samples` (real-time safe)
    ///
    /// Ring index `write_pos - latency` becomes the end of the linear buffer;
    /// everything before it follows in time order.
    pub fn capture(&mut self, recorder: &RingRecorder, latency_samples: usize) {
        let n = recorder.capacity();
        if n == 0 {
            return;
        }
        let end = (recorder.write_pos() + n - latency_samples % n) % n;
        let tail = n - end;

        let num_channels = self.frozen.len().min(recorder.num_channels());
        for ch in 0..num_channels {
            let src = recorder.channel(ch);
            let dst = &mut self.frozen[ch];
            if dst.len() != n {
                continue;
            }
            dst[..tail].copy_from_slice(&src[end..]);
            dst[tail..].copy_from_slice(&src[..end]);
        }

        // Dropping a Shared defers the free to the collector thread
        self.user = None;
        self.end = n;
        self.source = SnapshotSource::Recorder;
    }

    /// Use a loaded user sample as the loop source (real-time safe)
    pub fn substitute(&mut self, sample: Shared<UserSample>) {
        self.end = sample.len();
        self.user = Some(sample);
        self.source = SnapshotSource::UserSample;
    }

    /// Index one past the most recent sample
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Length of the active source buffer
    #[inline]
    pub fn len(&self) -> usize {
        match &self.user {
            Some(sample) => sample.len(),
            None => self.frozen.first().map_or(0, Vec::len),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        match &self.user {
            Some(sample) => sample.num_channels(),
            None => self.frozen.len(),
        }
    }

    #[inline]
    pub fn source(&self) -> SnapshotSource {
        self.source
    }

    /// Samples of one channel of the active source
    #[inline]
    pub fn channel(&self, ch: usize) -> &[Sample] {
        match &self.user {
            Some(sample) => sample.channel(ch),
            None => &self.frozen[ch],
        }
    }

    /// Recompute every bin of a waveform overview from the active source
    pub fn update_overview(&self, overview: &WaveformOverview) {
        let channels = self.num_channels();
        for bin in 0..overview.len() {
            overview.update_bin(bin, (0..channels).map(|ch| self.channel(ch)));
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}
