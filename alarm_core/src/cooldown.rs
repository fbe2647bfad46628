//! Cooldown gate that suppresses repeated triggers.

use std::time::{Duration, Instant};

/// Trigger bookkeeping owned by the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CooldownState {
    pub last_triggered_at: Option<Instant>,
    /// Host override: nothing fires before this instant.
    pub not_before: Option<Instant>,
}

impl CooldownState {
    /// Record an accepted trigger.
    #[inline]
    pub fn record(&mut self, now: Instant) {
        self.last_triggered_at = Some(now);
    }

    /// Forget the last trigger. The host's `not_before` override is kept.
    #[inline]
    pub fn reset(&mut self) {
        self.last_triggered_at = None;
    }
}

/// Whether a new burst may start at `now`.
pub fn can_trigger(now: Instant, state: &CooldownState, cooldown: Duration) -> bool {
    if let Some(not_before) = state.not_before
        && now < not_before
    {
        return false;
    }
    match state.last_triggered_at {
        None => true,
        Some(last) => now.saturating_duration_since(last) >= cooldown,
    }
}
