//! Builder that wires collaborators into a `SessionMachine`.
//!
//! All five collaborators are required; clock, settings and pulse timer fall
//! back to the real-time defaults.

use std::sync::Arc;

use alarm_traits::clock::{Clock, MonotonicClock};
use alarm_traits::{AuthorizationProvider, DataSource, Haptics, SampleSource, SensingSessionFactory};

use crate::burst::PulseTimer;
use crate::config::{AlarmSettings, SettingsHandle};
use crate::error::{BuildError, Result};
use crate::runner::SessionHandle;
use crate::session::{Collaborators, SessionMachine};
use crate::timer::ThreadPulseTimer;

#[derive(Default)]
pub struct SessionBuilder {
    authorization: Option<Box<dyn AuthorizationProvider>>,
    data_source: Option<Box<dyn DataSource>>,
    sensing: Option<Box<dyn SensingSessionFactory>>,
    samples: Option<Box<dyn SampleSource>>,
    haptics: Option<Box<dyn Haptics>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    settings: Option<SettingsHandle>,
    timer: Option<Box<dyn PulseTimer>>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authorization(mut self, a: impl AuthorizationProvider + 'static) -> Self {
        self.authorization = Some(Box::new(a));
        self
    }

    pub fn with_data_source(mut self, d: impl DataSource + 'static) -> Self {
        self.data_source = Some(Box::new(d));
        self
    }

    pub fn with_sensing(mut self, f: impl SensingSessionFactory + 'static) -> Self {
        self.sensing = Some(Box::new(f));
        self
    }

    pub fn with_samples(mut self, s: impl SampleSource + 'static) -> Self {
        self.samples = Some(Box::new(s));
        self
    }

    pub fn with_haptics(mut self, h: impl Haptics + 'static) -> Self {
        self.haptics = Some(Box::new(h));
        self
    }

    pub fn with_clock(mut self, c: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(c));
        self
    }

    /// Share an existing settings handle; later edits through it reach the session.
    pub fn with_settings(mut self, settings: SettingsHandle) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_pulse_timer(mut self, t: impl PulseTimer + 'static) -> Self {
        self.timer = Some(Box::new(t));
        self
    }

    pub fn build(self) -> Result<SessionMachine> {
        let collab = Collaborators {
            authorization: self
                .authorization
                .ok_or_else(|| eyre::Report::new(BuildError::MissingAuthorization))?,
            data_source: self
                .data_source
                .ok_or_else(|| eyre::Report::new(BuildError::MissingDataSource))?,
            sensing: self
                .sensing
                .ok_or_else(|| eyre::Report::new(BuildError::MissingSensing))?,
            samples: self
                .samples
                .ok_or_else(|| eyre::Report::new(BuildError::MissingSampleSource))?,
            haptics: self
                .haptics
                .ok_or_else(|| eyre::Report::new(BuildError::MissingHaptics))?,
        };
        let settings = self
            .settings
            .unwrap_or_else(|| SettingsHandle::new(AlarmSettings::default()));
        if settings.snapshot().pulse_interval.is_zero() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "pulse_interval must be > 0",
            )));
        }
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let timer = self
            .timer
            .unwrap_or_else(|| Box::new(ThreadPulseTimer::new()));
        Ok(SessionMachine::new(collab, clock, settings, timer))
    }

    /// Build and move the machine onto its actor thread.
    pub fn spawn(self) -> Result<SessionHandle> {
        Ok(SessionHandle::spawn(self.build()?))
    }
}
