//! Pitch and loop-length mapping
//!
//! The loop length is the period of a target frequency. The frequency comes
//! from the last MIDI note (plus pitch bend) or, with MIDI disabled, from the
//! squeeze control mapped onto an exponential duration curve:
//!
//! ```text
//! squeeze   0 ──► 1337 ms   (longest loop)
//! squeeze  30 ──► ~330.5 ms
//! squeeze 100 ──► 0.14 ms   (shortest loop)
//! ```

/// Shortest loop duration the squeeze control reaches (ms)
pub const MIN_LOOP_MS: f64 = 0.14;

/// Longest loop duration the squeeze control reaches (ms)
pub const MAX_LOOP_MS: f64 = 1337.0;

/// Curve exponent applied to the normalized squeeze value
///
/// Places squeeze 30 at ~330.514 ms.
pub const SQUEEZE_CURVE: f64 = 1.562;

/// Lower bound for any derived frequency (Hz)
pub const MIN_FREQUENCY_HZ: f64 = 0.001;

/// Reference pitch for note 69 (A4)
pub const REFERENCE_HZ: f64 = 440.0;
const REFERENCE_NOTE: f64 = 69.0;

/// Samples kept free at the end of the snapshot window
pub const LENGTH_SAFETY_MARGIN: usize = 16;

/// Equal-tempered frequency of a MIDI note
#[inline]
pub fn note_to_hz(note: u8) -> f64 {
    REFERENCE_HZ * 2f64.powf((note as f64 - REFERENCE_NOTE) / 12.0)
}

/// Frequency ratio for a shift in semitones
#[inline]
pub fn semitones_to_ratio(semitones: f64) -> f64 {
    2f64.powf(semitones / 12.0)
}

/// Map a normalized squeeze value (0..=1) to a loop duration in ms
///
/// Strictly decreasing; interpolates log-duration between [`MAX_LOOP_MS`] and
/// [`MIN_LOOP_MS`] along `squeeze01 ^ SQUEEZE_CURVE`.
pub fn squeeze_to_ms(squeeze01: f64) -> f64 {
    let t = squeeze01.clamp(0.0, 1.0).powf(SQUEEZE_CURVE);
    (MAX_LOOP_MS.ln() + t * (MIN_LOOP_MS.ln() - MAX_LOOP_MS.ln())).exp()
}

/// Loop length in samples for one period of `hz`, stretched by `speed`
///
/// Clamped to `1..=max(1, capacity - LENGTH_SAFETY_MARGIN)`.
pub fn loop_length_samples(hz: f64, speed: f64, sample_rate: f64, capacity: usize) -> usize {
    let hz = hz.max(MIN_FREQUENCY_HZ);
    let max_len = capacity.saturating_sub(LENGTH_SAFETY_MARGIN).max(1);
    let samples = ((1.0 / hz) * speed * sample_rate).round();
    if !samples.is_finite() || samples < 1.0 {
        return 1;
    }
    (samples as usize).min(max_len)
}

/// MIDI-driven pitch state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchState {
    /// Last note received while MIDI mode was enabled
    pub last_note: u8,
    /// Number of keys currently held
    pub notes_down: u32,
    /// Pitch bend in [-1, 1]
    pub bend: f32,
}

impl Default for PitchState {
    fn default() -> Self {
        Self {
            last_note: 60,
            notes_down: 0,
            bend: 0.0,
        }
    }
}

impl PitchState {
    pub fn note_on(&mut self, note: u8, midi_enabled: bool) {
        self.notes_down = self.notes_down.saturating_add(1);
        if midi_enabled {
            self.last_note = note;
        }
    }

    pub fn note_off(&mut self) {
        self.notes_down = self.notes_down.saturating_sub(1);
    }

    /// Apply a 14-bit pitch wheel value (8192 = centre)
    pub fn pitch_wheel(&mut self, value: u16) {
        let norm = (value as f32 - 8192.0) / 8192.0;
        self.bend = norm.clamp(-1.0, 1.0);
    }

    /// Frequency implied by the last note and the current bend
    pub fn note_frequency(&self, bend_range_semitones: f32) -> f64 {
        note_to_hz(self.last_note)
            * semitones_to_ratio(self.bend as f64 * bend_range_semitones as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_to_hz() {
        assert!((note_to_hz(69) - 440.0).abs() < 1e-9);
        assert!((note_to_hz(81) - 880.0).abs() < 1e-9);
        assert!((note_to_hz(57) - 220.0).abs() < 1e-9);
        assert!((note_to_hz(60) - 261.6256).abs() < 1e-3);
    }

    #[test]
    fn test_squeeze_endpoints() {
        assert!((squeeze_to_ms(0.0) - MAX_LOOP_MS).abs() < 1e-6);
        assert!((squeeze_to_ms(1.0) - MIN_LOOP_MS).abs() < 1e-9);
        // Out-of-range input is clamped
        assert!((squeeze_to_ms(-1.0) - MAX_LOOP_MS).abs() < 1e-6);
        assert!((squeeze_to_ms(2.0) - MIN_LOOP_MS).abs() < 1e-9);
    }

    #[test]
    fn test_squeeze_calibration_point() {
        assert!((squeeze_to_ms(0.30) - 330.514).abs() < 0.01);
    }

    #[test]
    fn test_squeeze_strictly_decreasing() {
        let mut previous = squeeze_to_ms(0.0);
        for step in 1..=100 {
            let ms = squeeze_to_ms(step as f64 / 100.0);
            assert!(ms < previous, "not decreasing at squeeze {}", step);
            previous = ms;
        }
    }

    #[test]
    fn test_loop_length_clamping() {
        let capacity = 192_000;
        // One period of 440 Hz at 48 kHz
        assert_eq!(loop_length_samples(440.0, 1.0, 48000.0, capacity), 109);
        // Speed stretches the loop
        assert_eq!(loop_length_samples(100.0, 2.0, 48000.0, capacity), 960);
        // Very high frequencies collapse to a single sample
        assert_eq!(loop_length_samples(1.0e9, 1.0, 48000.0, capacity), 1);
        // Zero frequency hits the floor and then the capacity clamp
        assert_eq!(
            loop_length_samples(0.0, 1.0, 48000.0, capacity),
            capacity - LENGTH_SAFETY_MARGIN
        );
    }

    #[test]
    fn test_pitch_wheel_normalization() {
        let mut pitch = PitchState::default();
        pitch.pitch_wheel(8192);
        assert_eq!(pitch.bend, 0.0);
        pitch.pitch_wheel(0);
        assert_eq!(pitch.bend, -1.0);
        pitch.pitch_wheel(16383);
        assert!(pitch.bend > 0.999 && pitch.bend < 1.0);
    }

    #[test]
    fn test_bend_shifts_frequency() {
        let mut pitch = PitchState {
            last_note: 69,
            ..Default::default()
        };
        pitch.pitch_wheel(16383);
        let hz = pitch.note_frequency(12.0);
        assert!((hz - 880.0).abs() < 0.2);
    }

    #[test]
    fn test_notes_down_floors_at_zero() {
        let mut pitch = PitchState::default();
        pitch.note_off();
        assert_eq!(pitch.notes_down, 0);
        pitch.note_on(64, false);
        assert_eq!(pitch.notes_down, 1);
        assert_eq!(pitch.last_note, 60, "MIDI-disabled note-on keeps the last note");
        pitch.note_on(64, true);
        assert_eq!(pitch.last_note, 64);
    }
}
