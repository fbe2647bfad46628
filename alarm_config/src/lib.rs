#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the wrist alarm.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every section is optional; omitted keys take the defaults the watch app
//!   ships with (medium sensitivity, medium intensity, 15 s cooldown).
use chrono::NaiveTime;
use serde::Deserialize;
use std::path::Path;

/// Three-step level shared by sensitivity and haptic intensity.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
}

/// Haptic pulse names accepted in `haptics.pattern`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PulseName {
    Notification,
    DirectionUp,
    DirectionDown,
    Success,
    Failure,
    Retry,
    Start,
    Stop,
    Click,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Detection {
    /// "low" | "medium" | "high"; higher is more sensitive.
    pub sensitivity: Level,
    /// Accelerometer update interval (ms).
    pub update_interval_ms: u64,
}

impl Default for Detection {
    fn default() -> Self {
        Self {
            sensitivity: Level::Medium,
            update_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Haptics {
    /// "low" | "medium" | "high": 10, 25 or 50 pulses per burst.
    pub intensity: Level,
    /// Delay between pulses of one burst (ms).
    pub pulse_interval_ms: u64,
    /// Repeating pulse pattern; empty falls back to a single "notification" pulse.
    pub pattern: Vec<PulseName>,
}

impl Default for Haptics {
    fn default() -> Self {
        Self {
            intensity: Level::Medium,
            pulse_interval_ms: 125,
            pattern: vec![PulseName::Notification, PulseName::DirectionUp],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Cooldown {
    /// Minimum seconds between two accepted triggers.
    pub seconds: u64,
    /// Optional: suppress every trigger until this many seconds after the session starts.
    pub not_before_s: Option<u64>,
}

impl Default for Cooldown {
    fn default() -> Self {
        Self {
            seconds: 15,
            not_before_s: None,
        }
    }
}

/// Wake schedule.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Alarm {
    /// Local time of day ("HH:MM") before which no burst may start.
    pub wake_at: Option<String>,
}

/// Parse a local "HH:MM" time of day.
pub fn parse_wake_time(s: &str) -> eyre::Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|e| eyre::eyre!("expected a time of day as HH:MM, got {s:?}: {e}"))
}

impl Alarm {
    pub fn wake_time(&self) -> eyre::Result<Option<NaiveTime>> {
        self.wake_at.as_deref().map(parse_wake_time).transpose()
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SimAuthorization {
    #[default]
    Granted,
    Denied,
    Undetermined,
}

/// Knobs for the simulated collaborators used by the CLI.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Simulation {
    /// Seconds of near-stillness before the simulated wearer starts moving.
    pub quiet_s: f64,
    /// Peak per-axis swing of the simulated movement (g).
    pub motion_amplitude_g: f64,
    /// Emit one synthetic sample as soon as updates start.
    pub warmup_sample: bool,
    pub authorization: SimAuthorization,
    /// Answer given when authorization is "undetermined" and gets requested.
    pub grant_on_request: bool,
    pub data_source_available: bool,
    pub sensor_available: bool,
    /// Make sensing session acquisition fail.
    pub fail_session: bool,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            quiet_s: 3.0,
            motion_amplitude_g: 0.4,
            warmup_sample: false,
            authorization: SimAuthorization::Granted,
            grant_on_request: true,
            data_source_available: true,
            sensor_available: true,
            fail_session: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub detection: Detection,
    #[serde(default)]
    pub haptics: Haptics,
    #[serde(default)]
    pub cooldown: Cooldown,
    #[serde(default)]
    pub alarm: Alarm,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub simulation: Simulation,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Detection
        if self.detection.update_interval_ms == 0 {
            eyre::bail!("detection.update_interval_ms must be >= 1");
        }
        if self.detection.update_interval_ms > 60 * 1000 {
            eyre::bail!("detection.update_interval_ms is unreasonably large (>60s)");
        }

        // Haptics
        if self.haptics.pulse_interval_ms == 0 {
            eyre::bail!("haptics.pulse_interval_ms must be >= 1");
        }
        if self.haptics.pulse_interval_ms > 10 * 1000 {
            eyre::bail!("haptics.pulse_interval_ms is unreasonably large (>10s)");
        }
        if self.haptics.pattern.len() > 64 {
            eyre::bail!("haptics.pattern must have at most 64 entries");
        }

        // Cooldown
        if self.cooldown.seconds > 24 * 60 * 60 {
            eyre::bail!("cooldown.seconds is unreasonably large (>24h)");
        }
        if let Some(nb) = self.cooldown.not_before_s
            && nb > 24 * 60 * 60
        {
            eyre::bail!("cooldown.not_before_s is unreasonably large (>24h)");
        }

        // Alarm
        if let Err(e) = self.alarm.wake_time() {
            eyre::bail!("alarm.wake_at is invalid: {e}");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        // Simulation
        if !(self.simulation.quiet_s.is_finite() && self.simulation.quiet_s >= 0.0) {
            eyre::bail!("simulation.quiet_s must be a finite number >= 0");
        }
        if !(self.simulation.motion_amplitude_g.is_finite()
            && (0.0..=8.0).contains(&self.simulation.motion_amplitude_g))
        {
            eyre::bail!("simulation.motion_amplitude_g must be in [0.0, 8.0]");
        }

        Ok(())
    }
}
