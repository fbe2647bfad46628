//! Simulated health platform: authorization, data source and workout sessions.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use alarm_traits::{
    AuthorizationProvider, AuthorizationStatus, BoxError, Completion, DataSource, SensingSession,
    SensingSessionFactory, SensingState, SessionDelegate,
};

use crate::error::SimError;

/// Authorization that answers prompts immediately with a fixed decision.
#[derive(Debug, Clone)]
pub struct SimAuthorization {
    status: Arc<Mutex<AuthorizationStatus>>,
    grant_on_request: bool,
}

impl SimAuthorization {
    pub fn new(status: AuthorizationStatus, grant_on_request: bool) -> Self {
        Self {
            status: Arc::new(Mutex::new(status)),
            grant_on_request,
        }
    }
}

impl AuthorizationProvider for SimAuthorization {
    fn current_status(&self) -> AuthorizationStatus {
        self.status
            .lock()
            .map(|g| *g)
            .unwrap_or(AuthorizationStatus::Undetermined)
    }

    fn request_authorization(&mut self, done: Completion<bool>) {
        let granted = self.grant_on_request;
        if let Ok(mut g) = self.status.lock() {
            *g = if granted {
                AuthorizationStatus::Granted
            } else {
                AuthorizationStatus::Denied
            };
        }
        tracing::info!(granted, "authorization prompt answered (simulated)");
        done(granted);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimDataSource {
    pub available: bool,
}

impl DataSource for SimDataSource {
    fn is_available(&self) -> bool {
        self.available
    }
}

/// Factory for simulated workout sessions.
#[derive(Debug, Clone, Default)]
pub struct SimSensingFactory {
    refuse: bool,
}

impl SimSensingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create` call fails.
    pub fn refusing() -> Self {
        Self { refuse: true }
    }
}

impl SensingSessionFactory for SimSensingFactory {
    fn create(
        &mut self,
        delegate: Arc<dyn SessionDelegate>,
    ) -> Result<Box<dyn SensingSession>, BoxError> {
        if self.refuse {
            return Err(Box::new(SimError::SessionRefused));
        }
        delegate.on_state_change(SensingState::Prepared, Instant::now());
        Ok(Box::new(SimSession {
            delegate,
            state: SensingState::Prepared,
        }))
    }
}

struct SimSession {
    delegate: Arc<dyn SessionDelegate>,
    state: SensingState,
}

impl SimSession {
    fn set_state(&mut self, to: SensingState) {
        if self.state == to {
            return;
        }
        tracing::debug!(from = ?self.state, to = ?to, "workout session state (simulated)");
        self.state = to;
        self.delegate.on_state_change(to, Instant::now());
    }
}

impl SensingSession for SimSession {
    fn start(&mut self) {
        self.set_state(SensingState::Running);
    }

    fn stop(&mut self) {
        self.set_state(SensingState::Stopped);
    }

    fn begin_collection(&mut self, done: Completion<bool>) {
        done(self.state == SensingState::Running);
    }

    fn end_collection(&mut self, done: Completion<bool>) {
        done(true);
    }

    fn finish(&mut self, done: Completion<bool>) {
        self.set_state(SensingState::Ended);
        done(true);
    }
}
