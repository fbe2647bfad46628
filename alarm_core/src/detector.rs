//! Threshold comparison turning a motion delta into a motion event.

use std::time::Instant;

/// A delta that met the active sensitivity threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionEvent {
    /// Delta magnitude in g (always >= 0).
    pub magnitude: f64,
    pub occurred_at: Instant,
}

/// True when `magnitude` meets or exceeds `threshold`.
#[inline]
pub fn is_motion(magnitude: f64, threshold: f64) -> bool {
    magnitude >= threshold
}

/// Evaluate a delta against a threshold, stamping an event at `now` on a hit.
pub fn detect(magnitude: f64, threshold: f64, now: Instant) -> Option<MotionEvent> {
    is_motion(magnitude, threshold).then_some(MotionEvent {
        magnitude,
        occurred_at: now,
    })
}
