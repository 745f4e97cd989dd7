//! Linear ramp value for gain envelopes and the portamento glide
//!
//! A ramp moves linearly from its current value to a target over a fixed
//! number of samples. Re-arming mid-ramp starts the new ramp from wherever the
//! value currently is, so there is never a step in the output.
//!
//! The same type is sampled at two rates: per sample for the loop and
//! passthrough envelopes, per block (via [`LinearRamp::skip`]) for the glide.

/// Linearly ramped value
#[derive(Debug, Clone, Copy)]
pub struct LinearRamp {
    current: f32,
    target: f32,
    /// Per-sample increment of the active ramp
    step: f32,
    /// Samples left until `current` lands on `target`
    remaining: u32,
    sample_rate: f32,
}

impl LinearRamp {
    /// Create a settled ramp holding `value`
    pub fn new(value: f32, sample_rate: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
            remaining: 0,
            sample_rate: sample_rate.max(1.0),
        }
    }

    /// Change the sample rate used to convert ramp times to samples
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
    }

    /// Jump to `value` immediately, cancelling any ramp
    pub fn set_value(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.remaining = 0;
    }

    /// Start a ramp from the current value to `target` over `seconds`
    ///
    /// A non-positive duration (or one shorter than a sample) jumps straight
    /// to the target.
    pub fn arm_ramp(&mut self, target: f32, seconds: f32) {
        let steps = (seconds.max(0.0) * self.sample_rate).round() as u32;
        self.target = target;
        if steps == 0 {
            self.current = target;
            self.step = 0.0;
            self.remaining = 0;
        } else {
            self.step = (target - self.current) / steps as f32;
            self.remaining = steps;
        }
    }

    /// Advance one sample and return the new value
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        if self.remaining == 0 {
            return self.target;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.current = self.target;
        } else {
            self.current += self.step;
        }
        self.current
    }

    /// Advance `samples` samples at once and return the new value
    pub fn skip(&mut self, samples: usize) -> f32 {
        if samples as u64 >= self.remaining as u64 {
            self.current = self.target;
            self.remaining = 0;
        } else {
            self.remaining -= samples as u32;
            self.current += self.step * samples as f32;
        }
        self.current
    }

    #[inline]
    pub fn current_value(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target_value(&self) -> f32 {
        self.target
    }

    /// True once the value has reached its target and is no longer moving
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.remaining == 0
    }
}

impl Default for LinearRamp {
    fn default() -> Self {
        Self::new(0.0, crate::types::DEFAULT_SAMPLE_RATE as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_reaches_target_linearly() {
        let mut ramp = LinearRamp::new(0.0, 1000.0);
        ramp.arm_ramp(1.0, 0.004); // 4 samples

        let values: Vec<f32> = (0..4).map(|_| ramp.next_value()).collect();
        assert!((values[0] - 0.25).abs() < 1e-6);
        assert!((values[1] - 0.5).abs() < 1e-6);
        assert!((values[2] - 0.75).abs() < 1e-6);
        assert_eq!(values[3], 1.0);
        assert!(ramp.is_settled());
        assert_eq!(ramp.next_value(), 1.0);
    }

    #[test]
    fn test_rearm_mid_ramp_is_continuous() {
        let mut ramp = LinearRamp::new(0.0, 1000.0);
        ramp.arm_ramp(1.0, 0.010);
        for _ in 0..5 {
            ramp.next_value();
        }
        let before = ramp.current_value();
        assert!((before - 0.5).abs() < 1e-5);

        ramp.arm_ramp(0.0, 0.010);
        let after = ramp.next_value();
        assert!((before - after).abs() <= 0.051);
        assert!(after < before);
        assert!(!ramp.is_settled());
    }

    #[test]
    fn test_zero_time_jumps() {
        let mut ramp = LinearRamp::new(0.3, 48000.0);
        ramp.arm_ramp(0.9, 0.0);
        assert!(ramp.is_settled());
        assert_eq!(ramp.current_value(), 0.9);
        assert_eq!(ramp.next_value(), 0.9);
    }

    #[test]
    fn test_skip_matches_per_sample_advance() {
        let mut a = LinearRamp::new(440.0, 48000.0);
        let mut b = a;
        a.arm_ramp(880.0, 0.1);
        b.arm_ramp(880.0, 0.1);

        for _ in 0..512 {
            a.next_value();
        }
        b.skip(512);
        assert!((a.current_value() - b.current_value()).abs() < 0.05);

        b.skip(1_000_000);
        assert!(b.is_settled());
        assert_eq!(b.current_value(), 880.0);
    }

    #[test]
    fn test_set_value_cancels_ramp() {
        let mut ramp = LinearRamp::new(1.0, 48000.0);
        ramp.arm_ramp(0.0, 1.0);
        ramp.next_value();
        ramp.set_value(0.0);
        assert!(ramp.is_settled());
        assert_eq!(ramp.target_value(), 0.0);
        assert_eq!(ramp.current_value(), 0.0);
    }
}
