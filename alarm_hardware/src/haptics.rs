use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use alarm_traits::{Haptics, PulseKind};

/// Haptic output that logs each pulse instead of buzzing a wrist.
#[derive(Debug, Clone, Default)]
pub struct LoggedHaptics {
    played: Arc<AtomicU64>,
}

impl LoggedHaptics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulses played through any clone.
    pub fn played(&self) -> u64 {
        self.played.load(Ordering::Relaxed)
    }
}

impl Haptics for LoggedHaptics {
    fn play(&mut self, kind: PulseKind) {
        let n = self.played.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(pulse = kind.as_str(), n, "haptic pulse (simulated)");
    }
}
