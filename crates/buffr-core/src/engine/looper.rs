//! Loop synthesizer
//!
//! Plays the last `current_len` samples of the snapshot window
//! `[end - current_len, end)` at a fractional, speed-scaled playhead.
//!
//! ```text
//!  snapshot: ... ─┬──────────── loop window ────────────┬
//!                 s = end - current                   end
//!                 ▲ playhead 0                  current-1 ▲
//!                                           │◄─ X ─►│
//!                                           seam crossfade
//! ```
//!
//! Over the last `X` samples before the boundary the window's tail is faded
//! into the material just before `s`, so the wrap back to `s` continues a
//! signal that was already playing. Length changes are only committed when
//! the playhead wraps.

use super::pitch::LENGTH_SAFETY_MARGIN;
use super::snapshot::Snapshot;
use crate::types::{AudioBuffer, Sample};

/// Seam crossfade duration (seconds)
pub const CROSSFADE_SECONDS: f64 = 0.003;

/// Crossfade length in samples for a sample rate (at least 1)
pub fn crossfade_len_for(sample_rate: u32) -> usize {
    ((sample_rate as f64 * CROSSFADE_SECONDS).round() as usize).max(1)
}

/// Linear interpolation between two samples
#[inline]
fn lerp(a: Sample, b: Sample, t: Sample) -> Sample {
    a + (b - a) * t
}

/// Playback state of the loop
#[derive(Debug, Clone)]
pub struct LoopState {
    current_len: usize,
    pending_len: usize,
    /// Fractional position inside the loop window, in `[0, current_len)`
    playhead: f64,
    active: bool,
    crossfade_len: usize,
    /// Longest length the active source can hold
    max_len: usize,
}

impl LoopState {
    pub fn new() -> Self {
        Self {
            current_len: 1,
            pending_len: 1,
            playhead: 0.0,
            active: false,
            crossfade_len: crossfade_len_for(crate::types::DEFAULT_SAMPLE_RATE),
            max_len: usize::MAX,
        }
    }

    /// Reset to an inactive loop of length 1
    pub fn prepare(&mut self, sample_rate: u32) {
        *self = Self {
            crossfade_len: crossfade_len_for(sample_rate),
            ..Self::new()
        };
    }

    #[inline]
    pub fn current_len(&self) -> usize {
        self.current_len
    }

    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending_len
    }

    #[inline]
    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn crossfade_len(&self) -> usize {
        self.crossfade_len
    }

    #[inline]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Length to commit at the next boundary, clamped to the source limit
    pub fn set_pending(&mut self, len: usize) {
        self.pending_len = len.clamp(1, self.max_len);
    }

    /// Limit lengths to a source of `source_len` samples
    ///
    /// Call whenever the snapshot changes. The pending length is clamped
    /// immediately; the current length follows at the next boundary.
    pub fn set_source_len(&mut self, source_len: usize) {
        self.max_len = source_len.saturating_sub(LENGTH_SAFETY_MARGIN).max(1);
        self.pending_len = self.pending_len.min(self.max_len);
    }

    /// Begin looping at the pending length, positioned on the seam
    pub fn start(&mut self) {
        self.current_len = self.pending_len;
        self.active = true;
        self.restart_at_boundary();
    }

    /// Move the playhead onto the last pre-boundary sample
    ///
    /// The next sample rendered is fully crossfaded into the loop start, and
    /// the one after wraps (committing the pending length).
    pub fn restart_at_boundary(&mut self) {
        self.playhead = (self.current_len - 1) as f64;
    }

    /// Deactivate and rewind
    pub fn stop(&mut self) {
        self.active = false;
        self.playhead = 0.0;
    }

    /// Render `len` frames into `out[0..len]` (real-time safe)
    ///
    /// Output channel `c` reads snapshot channel `min(c, channels - 1)`.
    /// Inactive loops and snapshots shorter than two samples render silence.
    pub fn render(&mut self, snapshot: &Snapshot, out: &mut AudioBuffer, len: usize, speed: f64) {
        let len = len.min(out.len());
        let n = snapshot.len();
        let src_channels = snapshot.num_channels();

        if !self.active || n <= 1 || src_channels == 0 {
            for ch in 0..out.num_channels() {
                out.channel_mut(ch)[..len].fill(0.0);
            }
            return;
        }

        let end = snapshot.end().min(n);
        let speed = speed.max(f64::MIN_POSITIVE);
        let x = self.crossfade_len as Sample;

        for i in 0..len {
            let current = self.current_len.min(n);
            let start = end.saturating_sub(current).min(n - 1);

            let ip = self.playhead.floor() as usize;
            let frac = (self.playhead - ip as f64) as Sample;
            let ip = ip.min(current - 1);

            let tail0 = window_index(start + ip, end, current, n);
            let tail1 = window_index(start + ip + 1, end, current, n);

            let samples_left = current - 1 - ip;
            let crossfade = if samples_left < self.crossfade_len {
                let head0 = (start + ip + n - current) % n;
                let head1 = (start + ip + 1 + n - current) % n;
                Some((samples_left as Sample / x, head0, head1))
            } else {
                None
            };

            for ch in 0..out.num_channels() {
                let src = snapshot.channel(ch.min(src_channels - 1));
                let tail = lerp(src[tail0], src[tail1], frac);
                out.channel_mut(ch)[i] = match crossfade {
                    Some((a, head0, head1)) => {
                        let head = lerp(src[head0], src[head1], frac);
                        tail * a + head * (1.0 - a)
                    }
                    None => tail,
                };
            }

            self.advance(speed);
        }
    }

    /// Step the playhead, committing the pending length on a wrap
    #[inline]
    fn advance(&mut self, speed: f64) {
        self.playhead += speed;
        let current = self.current_len as f64;
        if self.playhead >= current {
            self.playhead -= current;
            self.current_len = self.pending_len.max(1);
            let committed = self.current_len as f64;
            if self.playhead >= committed {
                self.playhead %= committed;
            }
        }
    }
}

impl Default for LoopState {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot index of a loop-window position, wrapped back into the window
#[inline]
fn window_index(index: usize, end: usize, current: usize, n: usize) -> usize {
    let index = if index >= end {
        (index + n - current) % n
    } else {
        index
    };
    index.min(n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recorder::RingRecorder;

    fn snapshot_of(sample_rate: u32, signal: impl Fn(usize) -> f32) -> Snapshot {
        let mut recorder = RingRecorder::new();
        recorder.prepare(sample_rate, 1);
        let capacity = recorder.capacity();
        let input = AudioBuffer::from_channels(vec![(0..capacity).map(&signal).collect()]);
        recorder.write(&input, 0, capacity);

        let mut snapshot = Snapshot::new();
        snapshot.prepare(capacity, 1);
        snapshot.capture(&recorder, 0);
        snapshot
    }

    #[test]
    fn test_crossfade_len() {
        assert_eq!(crossfade_len_for(48000), 144);
        assert_eq!(crossfade_len_for(44100), 132);
        assert_eq!(crossfade_len_for(100), 1);
    }

    #[test]
    fn test_start_positions_on_seam() {
        let mut state = LoopState::new();
        state.prepare(48000);
        assert_eq!(state.current_len(), 1);
        assert!(!state.is_active());

        state.set_pending(500);
        state.start();
        assert!(state.is_active());
        assert_eq!(state.current_len(), 500);
        assert_eq!(state.playhead(), 499.0);

        state.stop();
        assert!(!state.is_active());
        assert_eq!(state.playhead(), 0.0);
    }

    #[test]
    fn test_length_commits_only_at_boundary() {
        let snapshot = snapshot_of(100, |i| i as f32); // capacity 400
        let mut out = AudioBuffer::silence(1, 64);
        let mut state = LoopState::new();
        state.prepare(100);

        state.set_pending(10);
        state.start();
        // First sample sits on the seam; the wrap follows immediately
        state.render(&snapshot, &mut out, 1, 1.0);
        assert_eq!(state.playhead(), 0.0);
        assert_eq!(state.current_len(), 10);

        state.set_pending(20);
        state.render(&snapshot, &mut out, 9, 1.0);
        assert_eq!(state.current_len(), 10, "length changed mid-loop");
        assert_eq!(state.playhead(), 9.0);

        state.render(&snapshot, &mut out, 1, 1.0);
        assert_eq!(state.current_len(), 20);
        assert_eq!(state.playhead(), 0.0);
    }

    #[test]
    fn test_source_len_limits_lengths() {
        let mut state = LoopState::new();
        state.prepare(100);
        state.set_pending(300);
        assert_eq!(state.pending_len(), 300);

        // A 100-sample source holds at most 100 - margin
        state.set_source_len(100);
        assert_eq!(state.max_len(), 100 - LENGTH_SAFETY_MARGIN);
        assert_eq!(state.pending_len(), 84);
        state.set_pending(5000);
        assert_eq!(state.pending_len(), 84);
        state.start();
        assert_eq!(state.current_len(), 84);

        state.set_source_len(4);
        assert_eq!(state.max_len(), 1);
        assert_eq!(state.pending_len(), 1);
    }

    #[test]
    fn test_plays_window_ending_at_snapshot_end() {
        let snapshot = snapshot_of(100, |i| i as f32); // values 0..400
        let mut out = AudioBuffer::silence(2, 16);
        let mut state = LoopState::new();
        state.prepare(100); // crossfade of 1 sample

        state.set_pending(8);
        state.start();
        state.render(&snapshot, &mut out, 9, 1.0);

        // Seam samples are the one just before the window; the rest plays in order
        assert_eq!(out.channel(0)[0], 391.0);
        let expected: Vec<f32> = (392..399).map(|v| v as f32).collect();
        assert_eq!(&out.channel(0)[1..8], expected.as_slice());
        assert_eq!(out.channel(0)[8], 391.0);
        // Mono snapshot feeds both output channels
        assert_eq!(out.channel(1)[..9], out.channel(0)[..9]);
    }

    #[test]
    fn test_seam_is_continuous_for_sine() {
        let sr = 48000;
        let omega = 2.0 * std::f64::consts::PI * 220.0 / sr as f64;
        let snapshot = snapshot_of(sr, |i| (omega * i as f64).sin() as f32);
        let loop_len = 300;

        // Without a crossfade the seam would jump from the window end to its start
        let end = snapshot.end();
        let raw_jump = (snapshot.channel(0)[end - 1] - snapshot.channel(0)[end - loop_len]).abs();
        assert!(raw_jump > 0.3, "raw seam jump {}", raw_jump);

        let mut state = LoopState::new();
        state.prepare(sr);
        state.set_pending(loop_len);
        state.start();

        let mut out = AudioBuffer::silence(1, 256);
        let mut rendered = Vec::new();
        for _ in 0..8 {
            state.render(&snapshot, &mut out, 256, 1.0);
            rendered.extend_from_slice(out.channel(0));
        }

        // Sine slope is ~0.029 per sample; the blend adds at most 2 / X
        let max_step = rendered
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0f32, f32::max);
        assert!(max_step < 0.05, "discontinuity of {} across seam", max_step);
    }

    #[test]
    fn test_playhead_stays_in_range() {
        let snapshot = snapshot_of(1000, |i| (i % 7) as f32);
        let mut out = AudioBuffer::silence(1, 128);
        let mut state = LoopState::new();
        state.prepare(1000);
        state.set_pending(50);
        state.start();

        for (block, pending) in [37usize, 3, 120, 1, 64, 999].into_iter().enumerate() {
            state.set_pending(pending);
            state.render(&snapshot, &mut out, 128, 0.5 + block as f64 * 0.3);
            assert!(state.playhead() >= 0.0);
            assert!(
                state.playhead() < state.current_len() as f64,
                "playhead {} outside loop of {}",
                state.playhead(),
                state.current_len()
            );
        }
    }

    #[test]
    fn test_inactive_or_empty_renders_silence() {
        let snapshot = snapshot_of(100, |_| 1.0);
        let mut out = AudioBuffer::from_channels(vec![vec![0.7; 8]]);
        let mut state = LoopState::new();
        state.prepare(100);
        state.render(&snapshot, &mut out, 8, 1.0);
        assert!(out.channel(0).iter().all(|&s| s == 0.0));

        let empty = Snapshot::new();
        let mut out = AudioBuffer::from_channels(vec![vec![0.7; 8]]);
        state.set_pending(4);
        state.start();
        state.render(&empty, &mut out, 8, 1.0);
        assert!(out.channel(0).iter().all(|&s| s == 0.0));
    }
}
