//! Runtime settings for the session core.
//!
//! These are separate from the TOML-deserialized config in `alarm_config`;
//! see `conversions` for the mapping. The host shares one `SettingsHandle`
//! with the session, and the session reads it on every evaluation, so a
//! change takes effect on the next sample or the next burst.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use alarm_traits::PulseKind;

use crate::error::AlarmError;

/// Motion sensitivity. Higher sensitivity means a lower threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sensitivity {
    Low,
    #[default]
    Medium,
    High,
}

impl Sensitivity {
    /// Acceleration delta threshold in g.
    pub fn threshold_g(&self) -> f64 {
        match self {
            Sensitivity::Low => 0.30,
            Sensitivity::Medium => 0.15,
            Sensitivity::High => 0.08,
        }
    }
}

/// Haptic intensity, expressed as the minimum number of pulses per burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HapticIntensity {
    Low,
    #[default]
    Medium,
    High,
}

impl HapticIntensity {
    pub fn burst_count(&self) -> usize {
        match self {
            HapticIntensity::Low => 10,
            HapticIntensity::Medium => 25,
            HapticIntensity::High => 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSettings {
    pub sensitivity: Sensitivity,
    pub intensity: HapticIntensity,
    /// Minimum time between two accepted triggers.
    pub cooldown: Duration,
    /// Delay between consecutive pulses of a burst.
    pub pulse_interval: Duration,
    /// Accelerometer update interval requested from the sample source.
    pub update_interval: Duration,
    /// Repeating pulse pattern. Empty falls back to `PulseKind::default()`.
    pub pattern: Vec<PulseKind>,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            sensitivity: Sensitivity::Medium,
            intensity: HapticIntensity::Medium,
            cooldown: Duration::from_secs(15),
            pulse_interval: Duration::from_millis(125),
            update_interval: Duration::from_secs(1),
            pattern: vec![PulseKind::Notification, PulseKind::DirectionUp],
        }
    }
}

impl AlarmSettings {
    pub fn validate(&self) -> Result<(), AlarmError> {
        if self.pulse_interval.is_zero() {
            return Err(AlarmError::Config("pulse_interval must be > 0".into()));
        }
        if self.update_interval.is_zero() {
            return Err(AlarmError::Config("update_interval must be > 0".into()));
        }
        Ok(())
    }
}

/// Shared, host-writable view of the active settings.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<AlarmSettings>>,
}

impl SettingsHandle {
    pub fn new(settings: AlarmSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the current settings. A poisoned lock still yields the last written value.
    pub fn snapshot(&self) -> AlarmSettings {
        match self.inner.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Apply an in-place edit.
    pub fn update(&self, f: impl FnOnce(&mut AlarmSettings)) {
        match self.inner.write() {
            Ok(mut g) => f(&mut g),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn set_sensitivity(&self, level: Sensitivity) {
        self.update(|s| s.sensitivity = level);
    }

    pub fn set_intensity(&self, level: HapticIntensity) {
        self.update(|s| s.intensity = level);
    }
}
