//! Motion-delta signal between consecutive accelerometer samples.

use alarm_traits::Sample;

/// Euclidean norm of the per-axis difference between two samples, in g.
///
/// The square root is kept so the result compares directly against the
/// sensitivity thresholds, which are expressed in g.
#[inline]
pub fn delta(previous: &Sample, current: &Sample) -> f64 {
    let dx = current.x - previous.x;
    let dy = current.y - previous.y;
    let dz = current.z - previous.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}
