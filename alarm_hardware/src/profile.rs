//! Synthetic wrist motion.

use std::time::Duration;

use alarm_traits::Sample;

/// Resting wrist: gravity straight down the z axis.
pub const AT_REST: Sample = Sample {
    x: 0.0,
    y: 0.0,
    z: -1.0,
};

/// Near-stillness for `quiet`, then a swinging arm of `amplitude` g per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionProfile {
    pub quiet: Duration,
    pub amplitude: f64,
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self {
            quiet: Duration::from_secs(3),
            amplitude: 0.4,
        }
    }
}

impl MotionProfile {
    /// Profile that never leaves the resting position.
    pub fn still() -> Self {
        Self {
            quiet: Duration::MAX,
            amplitude: 0.0,
        }
    }

    /// Sample number `tick`, taken `elapsed` after updates started.
    pub fn sample_at(&self, elapsed: Duration, tick: u64) -> Sample {
        // Sensor noise stays well under the most sensitive threshold.
        let jitter = if tick % 2 == 0 { 0.002 } else { -0.002 };
        if elapsed < self.quiet {
            return Sample::new(AT_REST.x + jitter, AT_REST.y - jitter, AT_REST.z);
        }
        let phase = tick as f64 * 1.3;
        Sample::new(
            self.amplitude * phase.sin(),
            self.amplitude * (phase * 0.7).cos(),
            AT_REST.z + self.amplitude * 0.5 * phase.sin(),
        )
    }
}
