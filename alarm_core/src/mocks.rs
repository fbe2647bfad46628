//! Test and helper doubles for alarm_core.
//!
//! Every double is `Clone` and shares its state between clones: hand one clone
//! to the `SessionBuilder` and keep the other to script and inspect it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use alarm_traits::{
    AuthorizationProvider, AuthorizationStatus, BoxError, Completion, DataSource, Haptics,
    PulseKind, Sample, SampleHandler, SampleSource, SensingSession, SensingSessionFactory,
    SensingState, SessionDelegate,
};
use crossbeam_channel as xch;

use crate::burst::{BurstPlan, PulseTimer};
use crate::event::SessionEvent;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ── Authorization ────────────────────────────────────────────────────────────

#[derive(Default)]
struct AuthInner {
    status: AuthorizationStatus,
    /// `Some` answers requests immediately; `None` parks them until `resolve`.
    answer: Option<bool>,
    requests: usize,
    pending: Vec<Completion<bool>>,
}

#[derive(Clone, Default)]
pub struct StubAuthorization {
    inner: Arc<Mutex<AuthInner>>,
}

impl StubAuthorization {
    /// Reports `status`; requests are parked until `resolve`.
    pub fn new(status: AuthorizationStatus) -> Self {
        let s = Self::default();
        lock(&s.inner).status = status;
        s
    }

    /// Reports `status` and answers every request immediately with `answer`.
    pub fn answering(status: AuthorizationStatus, answer: bool) -> Self {
        let s = Self::new(status);
        lock(&s.inner).answer = Some(answer);
        s
    }

    pub fn granted() -> Self {
        Self::new(AuthorizationStatus::Granted)
    }

    pub fn set_status(&self, status: AuthorizationStatus) {
        lock(&self.inner).status = status;
    }

    pub fn requests(&self) -> usize {
        lock(&self.inner).requests
    }

    /// Complete every parked request.
    pub fn resolve(&self, granted: bool) {
        let pending = {
            let mut g = lock(&self.inner);
            g.status = if granted {
                AuthorizationStatus::Granted
            } else {
                AuthorizationStatus::Denied
            };
            std::mem::take(&mut g.pending)
        };
        for done in pending {
            done(granted);
        }
    }
}

impl AuthorizationProvider for StubAuthorization {
    fn current_status(&self) -> AuthorizationStatus {
        lock(&self.inner).status
    }

    fn request_authorization(&mut self, done: Completion<bool>) {
        let answer = {
            let mut g = lock(&self.inner);
            g.requests += 1;
            let Some(a) = g.answer else {
                g.pending.push(done);
                return;
            };
            g.status = if a {
                AuthorizationStatus::Granted
            } else {
                AuthorizationStatus::Denied
            };
            a
        };
        done(answer);
    }
}

// ── Data source ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct FlagDataSource {
    available: Arc<Mutex<bool>>,
}

impl FlagDataSource {
    pub fn new(available: bool) -> Self {
        Self {
            available: Arc::new(Mutex::new(available)),
        }
    }

    pub fn set_available(&self, available: bool) {
        *lock(&self.available) = available;
    }
}

impl DataSource for FlagDataSource {
    fn is_available(&self) -> bool {
        *lock(&self.available)
    }
}

// ── Sensing sessions ─────────────────────────────────────────────────────────

#[derive(Default)]
struct SensingInner {
    fail_create: bool,
    /// `Some` completes begin_collection immediately; `None` parks it.
    collection_result: Option<bool>,
    /// `end_collection` never calls back.
    stuck_ending: bool,
    created: usize,
    started: usize,
    stopped: usize,
    collections_ended: usize,
    finished: usize,
    delegates: Vec<Arc<dyn SessionDelegate>>,
    pending_begin: Vec<Completion<bool>>,
}

/// Factory for scripted sensing sessions that record every call.
#[derive(Clone, Default)]
pub struct ScriptedSensing {
    inner: Arc<Mutex<SensingInner>>,
}

impl ScriptedSensing {
    /// Sessions whose collection starts successfully right away.
    pub fn succeeding() -> Self {
        let s = Self::default();
        lock(&s.inner).collection_result = Some(true);
        s
    }

    /// `create` fails with an acquisition error.
    pub fn failing_create() -> Self {
        let s = Self::default();
        lock(&s.inner).fail_create = true;
        s
    }

    /// Collection start completes with `result`.
    pub fn collection(result: bool) -> Self {
        let s = Self::default();
        lock(&s.inner).collection_result = Some(result);
        s
    }

    /// Collection starts, but `end_collection` never completes.
    pub fn stuck_ending() -> Self {
        let s = Self::succeeding();
        lock(&s.inner).stuck_ending = true;
        s
    }

    /// Collection start is parked until `complete_collection`.
    pub fn deferred() -> Self {
        Self::default()
    }

    pub fn complete_collection(&self, success: bool) {
        let pending = std::mem::take(&mut lock(&self.inner).pending_begin);
        for done in pending {
            done(success);
        }
    }

    pub fn created(&self) -> usize {
        lock(&self.inner).created
    }

    pub fn started(&self) -> usize {
        lock(&self.inner).started
    }

    pub fn stopped(&self) -> usize {
        lock(&self.inner).stopped
    }

    pub fn collections_ended(&self) -> usize {
        lock(&self.inner).collections_ended
    }

    pub fn finished(&self) -> usize {
        lock(&self.inner).finished
    }

    /// Deliver a provider error through the most recent session's delegate.
    pub fn emit_error(&self, message: &str) {
        let delegate = lock(&self.inner).delegates.last().cloned();
        if let Some(d) = delegate {
            d.on_error(Box::new(std::io::Error::other(message.to_string())));
        }
    }

    /// Deliver a state change through the most recent session's delegate.
    pub fn emit_state(&self, state: SensingState) {
        let delegate = lock(&self.inner).delegates.last().cloned();
        if let Some(d) = delegate {
            d.on_state_change(state, Instant::now());
        }
    }
}

impl SensingSessionFactory for ScriptedSensing {
    fn create(
        &mut self,
        delegate: Arc<dyn SessionDelegate>,
    ) -> Result<Box<dyn SensingSession>, BoxError> {
        let mut g = lock(&self.inner);
        if g.fail_create {
            return Err(Box::new(std::io::Error::other("workout session unavailable")));
        }
        g.created += 1;
        g.delegates.push(delegate);
        Ok(Box::new(ScriptedSession {
            inner: self.inner.clone(),
        }))
    }
}

struct ScriptedSession {
    inner: Arc<Mutex<SensingInner>>,
}

impl SensingSession for ScriptedSession {
    fn start(&mut self) {
        lock(&self.inner).started += 1;
    }

    fn stop(&mut self) {
        lock(&self.inner).stopped += 1;
    }

    fn begin_collection(&mut self, done: Completion<bool>) {
        let result = {
            let mut g = lock(&self.inner);
            match g.collection_result {
                Some(r) => r,
                None => {
                    g.pending_begin.push(done);
                    return;
                }
            }
        };
        done(result);
    }

    fn end_collection(&mut self, done: Completion<bool>) {
        let stuck = {
            let mut g = lock(&self.inner);
            g.collections_ended += 1;
            g.stuck_ending
        };
        if !stuck {
            done(true);
        }
    }

    fn finish(&mut self, done: Completion<bool>) {
        lock(&self.inner).finished += 1;
        done(true);
    }
}

// ── Samples ──────────────────────────────────────────────────────────────────

struct SamplesInner {
    available: bool,
    handler: Option<SampleHandler>,
    interval: Option<Duration>,
    starts: usize,
    stops: usize,
}

/// Sample source fed by the test through `push`.
#[derive(Clone)]
pub struct ManualSampleSource {
    inner: Arc<Mutex<SamplesInner>>,
}

impl Default for ManualSampleSource {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ManualSampleSource {
    pub fn new(available: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SamplesInner {
                available,
                handler: None,
                interval: None,
                starts: 0,
                stops: 0,
            })),
        }
    }

    /// Deliver a sample to the installed handler. Returns false when no handler is installed.
    pub fn push(&self, x: f64, y: f64, z: f64) -> bool {
        let mut g = lock(&self.inner);
        match g.handler.as_mut() {
            Some(h) => {
                h(Sample::new(x, y, z));
                true
            }
            None => false,
        }
    }

    pub fn starts(&self) -> usize {
        lock(&self.inner).starts
    }

    pub fn stops(&self) -> usize {
        lock(&self.inner).stops
    }

    /// Interval requested by the most recent `start_updates`.
    pub fn last_interval(&self) -> Option<Duration> {
        lock(&self.inner).interval
    }
}

impl SampleSource for ManualSampleSource {
    fn is_available(&self) -> bool {
        lock(&self.inner).available
    }

    fn is_active(&self) -> bool {
        lock(&self.inner).handler.is_some()
    }

    fn start_updates(&mut self, interval: Duration, handler: SampleHandler) {
        let mut g = lock(&self.inner);
        g.starts += 1;
        g.interval = Some(interval);
        g.handler = Some(handler);
    }

    fn stop_updates(&mut self) {
        let mut g = lock(&self.inner);
        g.stops += 1;
        g.handler = None;
    }
}

// ── Haptics ──────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingHaptics {
    played: Arc<Mutex<Vec<PulseKind>>>,
}

impl RecordingHaptics {
    pub fn played(&self) -> Vec<PulseKind> {
        lock(&self.played).clone()
    }

    pub fn count(&self) -> usize {
        lock(&self.played).len()
    }
}

impl Haptics for RecordingHaptics {
    fn play(&mut self, kind: PulseKind) {
        lock(&self.played).push(kind);
    }
}

// ── Pulse timer ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct TimerInner {
    scheduled: Vec<(u64, BurstPlan)>,
    mailbox: Option<xch::Sender<SessionEvent>>,
    // Next pulse index to fire for the latest burst.
    cursor: usize,
    cancels: usize,
}

/// Pulse timer that fires only when the test says so.
///
/// `fire_next` posts the next pulse of the latest burst even after a cancel,
/// which lets tests check that late timer callbacks are ignored.
#[derive(Clone, Default)]
pub struct ManualPulseTimer {
    inner: Arc<Mutex<TimerInner>>,
}

impl ManualPulseTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> Vec<(u64, BurstPlan)> {
        lock(&self.inner).scheduled.clone()
    }

    pub fn bursts(&self) -> usize {
        lock(&self.inner).scheduled.len()
    }

    pub fn cancels(&self) -> usize {
        lock(&self.inner).cancels
    }

    /// Post the next pulse of the latest burst. Returns false when none are left.
    pub fn fire_next(&self) -> bool {
        let mut g = lock(&self.inner);
        let cursor = g.cursor;
        let Some((burst, plan)) = g.scheduled.last() else {
            return false;
        };
        let Some(pulse) = plan.pulses().nth(cursor) else {
            return false;
        };
        let ev = SessionEvent::PulseDue {
            burst: *burst,
            index: pulse.index,
            kind: pulse.kind,
        };
        let sent = g.mailbox.as_ref().is_some_and(|tx| tx.send(ev).is_ok());
        g.cursor += 1;
        sent
    }

    /// Post every remaining pulse of the latest burst; returns how many were posted.
    pub fn fire_all(&self) -> usize {
        let mut n = 0;
        while self.fire_next() {
            n += 1;
        }
        n
    }
}

impl PulseTimer for ManualPulseTimer {
    fn schedule(&mut self, burst: u64, plan: BurstPlan, mailbox: xch::Sender<SessionEvent>) {
        let mut g = lock(&self.inner);
        g.scheduled.push((burst, plan));
        g.mailbox = Some(mailbox);
        g.cursor = 0;
    }

    fn cancel(&mut self) {
        lock(&self.inner).cancels += 1;
    }
}
