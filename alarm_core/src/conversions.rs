//! `From` implementations bridging `alarm_config` types to `alarm_core` types.

use std::time::Duration;

use alarm_traits::PulseKind;

use crate::config::{AlarmSettings, HapticIntensity, Sensitivity};

// ── Levels ───────────────────────────────────────────────────────────────────

impl From<alarm_config::Level> for Sensitivity {
    fn from(l: alarm_config::Level) -> Self {
        match l {
            alarm_config::Level::Low => Sensitivity::Low,
            alarm_config::Level::Medium => Sensitivity::Medium,
            alarm_config::Level::High => Sensitivity::High,
        }
    }
}

impl From<alarm_config::Level> for HapticIntensity {
    fn from(l: alarm_config::Level) -> Self {
        match l {
            alarm_config::Level::Low => HapticIntensity::Low,
            alarm_config::Level::Medium => HapticIntensity::Medium,
            alarm_config::Level::High => HapticIntensity::High,
        }
    }
}

// ── Pulses ───────────────────────────────────────────────────────────────────

// Both types are foreign to this crate, so this is a plain function rather than `From`.
pub fn pulse_kind(p: alarm_config::PulseName) -> PulseKind {
    use alarm_config::PulseName as P;
    match p {
        P::Notification => PulseKind::Notification,
        P::DirectionUp => PulseKind::DirectionUp,
        P::DirectionDown => PulseKind::DirectionDown,
        P::Success => PulseKind::Success,
        P::Failure => PulseKind::Failure,
        P::Retry => PulseKind::Retry,
        P::Start => PulseKind::Start,
        P::Stop => PulseKind::Stop,
        P::Click => PulseKind::Click,
    }
}

// ── AlarmSettings ────────────────────────────────────────────────────────────

impl From<&alarm_config::Config> for AlarmSettings {
    fn from(c: &alarm_config::Config) -> Self {
        Self {
            sensitivity: c.detection.sensitivity.into(),
            intensity: c.haptics.intensity.into(),
            cooldown: Duration::from_secs(c.cooldown.seconds),
            pulse_interval: Duration::from_millis(c.haptics.pulse_interval_ms),
            update_interval: Duration::from_millis(c.detection.update_interval_ms),
            pattern: c.haptics.pattern.iter().copied().map(pulse_kind).collect(),
        }
    }
}
