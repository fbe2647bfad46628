//! Session state machine.
//!
//! `SessionMachine` is the single owner of session state: lifecycle status,
//! cooldown, burst bookkeeping and the baseline sample. Every mutation goes
//! through `handle`, fed from one mailbox. Collaborator callbacks (authorization
//! answers, collection start, provider delegate calls, samples, burst pulses)
//! never mutate state themselves; they post a `SessionEvent` and return.
//!
//! The machine is synchronous. `runner::SessionHandle` drives it from a
//! dedicated actor thread; tests drive it directly with `pump`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alarm_traits::clock::Clock;
use alarm_traits::{
    AuthorizationProvider, AuthorizationStatus, BoxError, DataSource, Haptics, PulseKind, Sample,
    SampleSource, SensingSession, SensingSessionFactory, SensingState, SessionDelegate,
};
use crossbeam_channel as xch;

use crate::burst::{BurstPlan, BurstState, PulseTimer};
use crate::config::{AlarmSettings, SettingsHandle};
use crate::cooldown::{self, CooldownState};
use crate::detector::{self, MotionEvent};
use crate::error::AlarmError;
use crate::event::SessionEvent;
use crate::signal;
use crate::status::{BurstNotice, SessionSnapshot, SessionStatus, StatusBoard, StatusChange};

/// Stopped sessions kept waiting for `end_collection`. Past this, the oldest is
/// finished without waiting.
pub const MAX_RETIRING_SESSIONS: usize = 4;

/// Host-provided collaborators, injected once at construction.
pub struct Collaborators {
    pub authorization: Box<dyn AuthorizationProvider>,
    pub data_source: Box<dyn DataSource>,
    pub sensing: Box<dyn SensingSessionFactory>,
    pub samples: Box<dyn SampleSource>,
    pub haptics: Box<dyn Haptics>,
}

/// Forwards sensing-session delegate calls into the mailbox, tagged with the
/// attempt that created the session.
struct MailboxDelegate {
    attempt: u64,
    mailbox: xch::Sender<SessionEvent>,
}

impl SessionDelegate for MailboxDelegate {
    fn on_state_change(&self, state: SensingState, at: Instant) {
        let _ = self.mailbox.send(SessionEvent::ProviderStateChanged {
            attempt: self.attempt,
            state,
            at,
        });
    }

    fn on_error(&self, error: BoxError) {
        let _ = self.mailbox.send(SessionEvent::ProviderFailed {
            attempt: self.attempt,
            reason: error.to_string(),
        });
    }
}

struct ActiveSensing {
    attempt: u64,
    session: Box<dyn SensingSession>,
}

pub struct SessionMachine {
    collab: Collaborators,
    clock: Arc<dyn Clock + Send + Sync>,
    settings: SettingsHandle,
    timer: Box<dyn PulseTimer>,
    tx: xch::Sender<SessionEvent>,
    rx: xch::Receiver<SessionEvent>,
    board: StatusBoard,

    status: SessionStatus,
    authorization: AuthorizationStatus,
    last_error: Option<AlarmError>,
    // Generation of the current start attempt; callbacks from older attempts are dropped.
    attempt: u64,
    start_in_flight: bool,
    sensing: Option<ActiveSensing>,
    // Sessions stopped but still waiting for end_collection to complete.
    retiring: HashMap<u64, Box<dyn SensingSession>>,
    ingesting: bool,
    previous: Option<Sample>,
    cooldown: CooldownState,
    burst: BurstState,
    burst_seq: u64,
    bursts_fired: u64,
    last_motion: Option<MotionEvent>,
}

impl core::fmt::Debug for SessionMachine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionMachine")
            .field("status", &self.status)
            .field("attempt", &self.attempt)
            .field("ingesting", &self.ingesting)
            .field("burst", &self.burst)
            .field("bursts_fired", &self.bursts_fired)
            .finish()
    }
}

impl SessionMachine {
    pub fn new(
        collab: Collaborators,
        clock: Arc<dyn Clock + Send + Sync>,
        settings: SettingsHandle,
        timer: Box<dyn PulseTimer>,
    ) -> Self {
        let (tx, rx) = xch::unbounded();
        let machine = Self {
            collab,
            clock,
            settings,
            timer,
            tx,
            rx,
            board: StatusBoard::new(),
            status: SessionStatus::Starting,
            authorization: AuthorizationStatus::Undetermined,
            last_error: None,
            attempt: 0,
            start_in_flight: false,
            sensing: None,
            retiring: HashMap::new(),
            ingesting: false,
            previous: None,
            cooldown: CooldownState::default(),
            burst: BurstState::default(),
            burst_seq: 0,
            bursts_fired: 0,
            last_motion: None,
        };
        machine.publish();
        machine
    }

    /// Sender side of this machine's mailbox.
    pub fn mailbox(&self) -> xch::Sender<SessionEvent> {
        self.tx.clone()
    }

    pub(crate) fn receiver(&self) -> xch::Receiver<SessionEvent> {
        self.rx.clone()
    }

    pub fn board(&self) -> &StatusBoard {
        &self.board
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_monitoring(&self) -> bool {
        self.status == SessionStatus::Monitoring
    }

    pub fn burst_state(&self) -> BurstState {
        self.burst
    }

    pub fn cooldown_state(&self) -> CooldownState {
        self.cooldown
    }

    /// Stopped sensing sessions whose `end_collection` has not completed yet.
    pub fn retiring_sessions(&self) -> usize {
        self.retiring.len()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            authorization: self.authorization,
            burst_active: self.burst.is_active(),
            bursts_fired: self.bursts_fired,
            last_motion: self.last_motion,
            last_error: self.last_error.clone(),
        }
    }

    /// Handle every queued event, including ones posted while handling.
    /// Returns the number of events processed. Stops early on `Shutdown`.
    pub fn pump(&mut self) -> usize {
        let mut n = 0;
        while let Ok(ev) = self.rx.try_recv() {
            n += 1;
            let shutdown = matches!(ev, SessionEvent::Shutdown);
            self.handle(ev);
            if shutdown {
                break;
            }
        }
        n
    }

    /// Single mutation entry point.
    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::AttemptStart => self.attempt_start(),
            SessionEvent::RetryAuthorization => self.retry_authorization(),
            SessionEvent::Stop | SessionEvent::Shutdown => self.stop_session(),
            SessionEvent::SetCooldownNotBefore(at) => self.set_cooldown_not_before(at),
            SessionEvent::AuthorizationResolved { attempt, granted } => {
                self.on_authorization(attempt, granted)
            }
            SessionEvent::CollectionStarted { attempt, success } => {
                self.on_collection_started(attempt, success)
            }
            SessionEvent::CollectionEnded { attempt, success } => {
                self.on_collection_ended(attempt, success)
            }
            SessionEvent::ProviderStateChanged { attempt, state, at } => {
                self.on_provider_state(attempt, state, at)
            }
            SessionEvent::ProviderFailed { attempt, reason } => {
                self.on_provider_failed(attempt, reason)
            }
            SessionEvent::Sample { attempt, sample } => self.on_sample(attempt, sample),
            SessionEvent::PulseDue { burst, index, kind } => self.on_pulse(burst, index, kind),
        }
    }

    // ── Host commands ────────────────────────────────────────────────────────

    /// Begin (or resume) a session. No-op when ended, monitoring, or already starting.
    pub fn attempt_start(&mut self) {
        match self.status {
            SessionStatus::Ended => {
                tracing::debug!("attempt_start ignored: session ended");
                return;
            }
            SessionStatus::Monitoring => return,
            _ => {}
        }
        if self.start_in_flight {
            tracing::debug!(attempt = self.attempt, "attempt_start ignored: start in flight");
            return;
        }

        self.attempt += 1;
        self.start_in_flight = true;
        self.transition(SessionStatus::Starting, None);

        self.authorization = self.collab.authorization.current_status();
        tracing::debug!(attempt = self.attempt, authorization = ?self.authorization, "start attempt");
        match self.authorization {
            AuthorizationStatus::Granted => self.start_monitoring(),
            AuthorizationStatus::Undetermined => {
                let mailbox = self.tx.clone();
                let attempt = self.attempt;
                self.collab
                    .authorization
                    .request_authorization(Box::new(move |granted| {
                        let _ = mailbox.send(SessionEvent::AuthorizationResolved { attempt, granted });
                    }));
            }
            AuthorizationStatus::Denied => self.abort_start(
                SessionStatus::NeedsAuthorization,
                AlarmError::AuthorizationDenied,
            ),
        }
    }

    /// Retry from `NeedsAuthorization` or `Failed`; ignored in any other state.
    pub fn retry_authorization(&mut self) {
        if !self.status.accepts_retry() {
            tracing::debug!(status = %self.status, "retry ignored");
            return;
        }
        self.attempt_start();
    }

    /// End the session. Always succeeds and is idempotent.
    pub fn stop_session(&mut self) {
        self.stop_ingestion();
        self.cancel_burst();
        self.retire_sensing();
        self.start_in_flight = false;
        self.transition(SessionStatus::Ended, None);
    }

    /// Suppress triggers before `at`; `None` clears the override.
    pub fn set_cooldown_not_before(&mut self, at: Option<Instant>) {
        if self.status.is_terminal() {
            return;
        }
        self.cooldown.not_before = at;
        tracing::debug!(not_before = ?at, "cooldown override updated");
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    fn start_monitoring(&mut self) {
        if !self.collab.data_source.is_available() {
            self.abort_start(
                SessionStatus::DataSourceUnavailable,
                AlarmError::DataSourceUnavailable,
            );
            return;
        }
        if !self.collab.samples.is_available() {
            self.abort_start(SessionStatus::SensorUnavailable, AlarmError::SensorUnavailable);
            return;
        }
        if self.sensing.is_some() {
            tracing::debug!("sensing session already active");
            self.start_in_flight = false;
            return;
        }

        let attempt = self.attempt;
        let delegate = Arc::new(MailboxDelegate {
            attempt,
            mailbox: self.tx.clone(),
        });
        let mut session = match self.collab.sensing.create(delegate) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "sensing session acquisition failed");
                self.abort_start(
                    SessionStatus::Failed,
                    AlarmError::SessionAcquisition(e.to_string()),
                );
                return;
            }
        };
        session.start();
        let mailbox = self.tx.clone();
        session.begin_collection(Box::new(move |success| {
            let _ = mailbox.send(SessionEvent::CollectionStarted { attempt, success });
        }));
        self.sensing = Some(ActiveSensing { attempt, session });
    }

    fn on_authorization(&mut self, attempt: u64, granted: bool) {
        if self.is_stale(attempt) || !self.start_in_flight {
            return;
        }
        self.authorization = self.collab.authorization.current_status();
        if granted {
            self.start_monitoring();
        } else {
            self.abort_start(
                SessionStatus::NeedsAuthorization,
                AlarmError::AuthorizationDenied,
            );
        }
    }

    fn on_collection_started(&mut self, attempt: u64, success: bool) {
        if self.is_stale(attempt) || !self.start_in_flight {
            return;
        }
        if !success {
            tracing::warn!(attempt, "data collection did not start");
            self.retire_sensing();
            self.abort_start(
                SessionStatus::Failed,
                AlarmError::SessionAcquisition("data collection did not start".into()),
            );
            return;
        }

        self.start_in_flight = false;
        self.previous = None;
        self.cooldown.reset();
        self.cancel_burst();
        let interval = self.settings.snapshot().update_interval;
        self.begin_ingestion(interval);
        tracing::info!(
            attempt,
            update_interval_ms = interval.as_millis() as u64,
            "monitoring started"
        );
        self.transition(SessionStatus::Monitoring, None);
    }

    fn on_collection_ended(&mut self, attempt: u64, success: bool) {
        // Teardown only; allowed after the session has ended.
        if let Some(mut session) = self.retiring.remove(&attempt) {
            tracing::debug!(attempt, success, "collection ended, finishing session");
            session.finish(Box::new(move |ok| {
                tracing::trace!(attempt, ok, "sensing session finished");
            }));
        }
    }

    fn on_provider_state(&mut self, attempt: u64, state: SensingState, _at: Instant) {
        if self.is_stale(attempt) {
            return;
        }
        tracing::debug!(attempt, ?state, "provider state change");
        match state {
            SensingState::Stopped | SensingState::Ended
                if matches!(
                    self.status,
                    SessionStatus::Monitoring | SessionStatus::Starting
                ) && self.sensing.is_some() =>
            {
                self.fail_provider("sensing session ended unexpectedly".into());
            }
            _ => {}
        }
    }

    fn on_provider_failed(&mut self, attempt: u64, reason: String) {
        if self.is_stale(attempt) || self.sensing.is_none() {
            return;
        }
        tracing::warn!(attempt, %reason, "sensing provider error");
        self.fail_provider(reason);
    }

    fn fail_provider(&mut self, reason: String) {
        self.stop_ingestion();
        self.cancel_burst();
        self.retire_sensing();
        self.start_in_flight = false;
        self.transition(SessionStatus::Failed, Some(AlarmError::ProviderRuntime(reason)));
    }

    fn abort_start(&mut self, to: SessionStatus, error: AlarmError) {
        tracing::info!(error = %error, "start attempt aborted");
        self.start_in_flight = false;
        self.transition(to, Some(error));
    }

    /// Ended sessions accept nothing; other attempts' callbacks are stale.
    fn is_stale(&self, attempt: u64) -> bool {
        self.status.is_terminal() || attempt != self.attempt
    }

    // ── Ingestion ────────────────────────────────────────────────────────────

    fn begin_ingestion(&mut self, interval: Duration) {
        if self.collab.samples.is_active() {
            tracing::warn!("sample source already active; not installing a second handler");
        } else {
            let mailbox = self.tx.clone();
            let attempt = self.attempt;
            self.collab
                .samples
                .start_updates(interval, Box::new(move |sample| {
                    let _ = mailbox.send(SessionEvent::Sample { attempt, sample });
                }));
        }
        self.ingesting = true;
    }

    fn stop_ingestion(&mut self) {
        if self.ingesting {
            self.collab.samples.stop_updates();
            self.ingesting = false;
        }
        self.previous = None;
    }

    fn on_sample(&mut self, attempt: u64, sample: Sample) {
        if self.is_stale(attempt) || !self.ingesting || self.status != SessionStatus::Monitoring {
            return;
        }
        let Some(previous) = self.previous.replace(sample) else {
            // First sample only establishes the baseline.
            return;
        };

        let settings = self.settings.snapshot();
        let magnitude = signal::delta(&previous, &sample);
        let threshold = settings.sensitivity.threshold_g();
        let now = self.clock.now();
        tracing::trace!(magnitude, threshold, "sample");

        if let Some(event) = detector::detect(magnitude, threshold, now) {
            self.last_motion = Some(event);
            self.on_motion(event, &settings);
            self.publish();
        }
    }

    fn on_motion(&mut self, event: MotionEvent, settings: &AlarmSettings) {
        if self.burst.is_active() {
            tracing::trace!(magnitude = event.magnitude, "motion during active burst, dropped");
            return;
        }
        if !cooldown::can_trigger(event.occurred_at, &self.cooldown, settings.cooldown) {
            tracing::debug!(magnitude = event.magnitude, "motion suppressed by cooldown");
            return;
        }

        let plan = BurstPlan::new(settings.intensity, &settings.pattern, settings.pulse_interval);
        if !self.burst.begin(plan.len()) {
            return;
        }
        self.cooldown.record(event.occurred_at);
        self.burst_seq += 1;
        self.bursts_fired += 1;
        tracing::info!(
            burst = self.burst_seq,
            magnitude = event.magnitude,
            pulses = plan.len(),
            "motion trigger accepted, starting burst"
        );
        let pulses = plan.len();
        self.timer.schedule(self.burst_seq, plan, self.tx.clone());
        self.board.notify_burst(BurstNotice::Started {
            n: self.bursts_fired,
            magnitude: event.magnitude,
            pulses,
            at: event.occurred_at,
        });
    }

    // ── Bursts ───────────────────────────────────────────────────────────────

    fn on_pulse(&mut self, burst: u64, index: usize, kind: PulseKind) {
        if self.status.is_terminal() || burst != self.burst_seq || !self.burst.is_active() {
            tracing::trace!(burst, index, "stale pulse dropped");
            return;
        }
        self.collab.haptics.play(kind);
        if self.burst.pulse_fired() {
            tracing::debug!(burst, "burst complete");
            self.publish();
            self.board.notify_burst(BurstNotice::Completed {
                n: self.bursts_fired,
            });
        }
    }

    fn cancel_burst(&mut self) {
        if self.burst.is_active() {
            tracing::debug!(
                burst = self.burst_seq,
                remaining = self.burst.pulses_remaining(),
                "cancelling burst"
            );
        }
        self.timer.cancel();
        self.burst.reset();
    }

    fn retire_sensing(&mut self) {
        let Some(ActiveSensing {
            attempt,
            mut session,
        }) = self.sensing.take()
        else {
            return;
        };
        session.stop();
        let mailbox = self.tx.clone();
        session.end_collection(Box::new(move |success| {
            let _ = mailbox.send(SessionEvent::CollectionEnded { attempt, success });
        }));
        self.retiring.insert(attempt, session);
        while self.retiring.len() > MAX_RETIRING_SESSIONS {
            let Some(oldest) = self.retiring.keys().min().copied() else {
                break;
            };
            if let Some(mut stuck) = self.retiring.remove(&oldest) {
                tracing::warn!(attempt = oldest, "end_collection never completed, finishing anyway");
                stuck.finish(Box::new(move |ok| {
                    tracing::trace!(attempt = oldest, ok, "sensing session finished");
                }));
            }
        }
    }

    // ── Publication ──────────────────────────────────────────────────────────

    fn transition(&mut self, to: SessionStatus, error: Option<AlarmError>) {
        let from = self.status;
        if from.is_terminal() {
            return;
        }
        self.status = to;
        match (&error, to) {
            (Some(e), _) => self.last_error = Some(e.clone()),
            (None, SessionStatus::Monitoring) => self.last_error = None,
            _ => {}
        }
        self.publish();
        if from != to {
            tracing::info!(%from, %to, "session status");
            self.board.notify(&StatusChange {
                from,
                to,
                at: self.clock.now(),
                error,
            });
        }
    }

    fn publish(&self) {
        self.board.publish(self.snapshot());
    }
}
