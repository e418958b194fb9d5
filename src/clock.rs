//! Fixed-step simulation clock.
//!
//! The flow field is driven by simulation time, not wall-clock time. Each
//! integration step advances the clock by the same delta no matter how long
//! the frame took, so the field evolves identically for a given step count.

/// Default step: a fifth of a 144 Hz frame.
pub const DEFAULT_TIME_DELTA: f32 = (1.0 / 144.0) * 0.2;

/// Step counter plus the fixed delta; elapsed time is derived from both.
///
/// Elapsed time is `steps * time_delta` evaluated in f64, so every step
/// moves the clock by the same amount however long the run has been going.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationClock {
    time_delta: f32,
    steps: u64,
}

impl SimulationClock {
    pub fn new(time_delta: f32) -> Self {
        Self {
            time_delta,
            steps: 0,
        }
    }

    /// Advance by one step and return the new elapsed time.
    pub fn advance(&mut self) -> f32 {
        self.steps += 1;
        self.elapsed()
    }

    /// Elapsed simulation time in seconds.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        (self.steps as f64 * self.time_delta as f64) as f32
    }

    #[inline]
    pub fn time_delta(&self) -> f32 {
        self.time_delta
    }

    /// Number of completed steps.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_DELTA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_new() {
        let clock = SimulationClock::default();
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.steps(), 0);
        assert_eq!(clock.time_delta(), DEFAULT_TIME_DELTA);
    }

    #[test]
    fn test_advance_is_fixed_and_monotonic() {
        let mut clock = SimulationClock::new(0.25);
        let mut last = clock.elapsed();
        for step in 1..=8 {
            let now = clock.advance();
            assert!(now > last);
            assert_eq!(now, 0.25 * step as f32);
            last = now;
        }
        assert_eq!(clock.steps(), 8);
    }

    #[test]
    fn test_rate_holds_after_long_runs() {
        let time_delta = DEFAULT_TIME_DELTA;
        // Roughly a day of frames at 144 Hz: elapsed is past 16384 s.
        let mut clock = SimulationClock {
            time_delta,
            steps: 11_800_000,
        };
        let before = clock.elapsed();
        assert!(before >= 16_384.0);
        for _ in 0..1000 {
            clock.advance();
        }
        let advanced = clock.elapsed() - before;
        let expected = 1000.0 * time_delta;
        // One f32 ulp at this magnitude is ~0.002.
        assert!((advanced - expected).abs() < 0.005, "advanced {advanced}, expected {expected}");
    }

    #[test]
    fn test_clock_keeps_moving_past_f32_step_resolution() {
        let mut clock = SimulationClock {
            time_delta: DEFAULT_TIME_DELTA,
            steps: 23_600_000,
        };
        let before = clock.elapsed();
        assert!(before >= 32_768.0);
        let mut last = before;
        for _ in 0..1000 {
            let now = clock.advance();
            assert!(now >= last);
            last = now;
        }
        assert!(last > before);
        assert_eq!(clock.steps(), 23_600_000 + 1000);
    }
}
