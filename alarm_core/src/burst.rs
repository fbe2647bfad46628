//! Haptic burst planning and bookkeeping.
//!
//! A burst is planned up front as a list of pulses at fixed offsets. The
//! `PulseTimer` delivers each pulse back to the session as a
//! `SessionEvent::PulseDue`; the session plays it and counts it off
//! `BurstState`. Timers never touch session state directly.

use std::time::Duration;

use alarm_traits::PulseKind;
use crossbeam_channel as xch;

use crate::config::HapticIntensity;
use crate::event::SessionEvent;

/// One pulse of a planned burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledPulse {
    pub index: usize,
    /// Delay from burst start.
    pub offset: Duration,
    pub kind: PulseKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurstPlan {
    interval: Duration,
    kinds: Vec<PulseKind>,
}

impl BurstPlan {
    /// Plan `max(intensity.burst_count(), pattern.len())` pulses cycling through `pattern`.
    pub fn new(intensity: HapticIntensity, pattern: &[PulseKind], interval: Duration) -> Self {
        let fallback = [PulseKind::default()];
        let pattern = if pattern.is_empty() {
            &fallback[..]
        } else {
            pattern
        };
        let len = intensity.burst_count().max(pattern.len());
        let kinds = (0..len).map(|i| pattern[i % pattern.len()]).collect();
        Self { interval, kinds }
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Total time from the first to the last pulse.
    pub fn span(&self) -> Duration {
        self.offset_of(self.kinds.len().saturating_sub(1))
    }

    pub fn pulses(&self) -> impl Iterator<Item = ScheduledPulse> + '_ {
        self.kinds
            .iter()
            .enumerate()
            .map(|(index, &kind)| ScheduledPulse {
                index,
                offset: self.offset_of(index),
                kind,
            })
    }

    fn offset_of(&self, index: usize) -> Duration {
        self.interval
            .saturating_mul(u32::try_from(index).unwrap_or(u32::MAX))
    }
}

/// Live burst bookkeeping; at most one burst is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstState {
    active: bool,
    pulses_remaining: usize,
}

impl BurstState {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pulses_remaining(&self) -> usize {
        self.pulses_remaining
    }

    /// Mark a burst of `pulses` as started. Returns false (and changes nothing)
    /// while another burst is still active.
    pub fn begin(&mut self, pulses: usize) -> bool {
        if self.active {
            return false;
        }
        self.active = pulses > 0;
        self.pulses_remaining = pulses;
        self.active
    }

    /// Count one fired pulse. Returns true when that was the last one.
    pub fn pulse_fired(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.pulses_remaining = self.pulses_remaining.saturating_sub(1);
        if self.pulses_remaining == 0 {
            self.active = false;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Delivers the pulses of a planned burst back to the session mailbox.
///
/// Implementations must not block the caller: `schedule` returns as soon as
/// the timer is armed. `cancel` drops every pulse that has not been posted yet.
pub trait PulseTimer: Send {
    fn schedule(&mut self, burst: u64, plan: BurstPlan, mailbox: xch::Sender<SessionEvent>);
    fn cancel(&mut self);
}
