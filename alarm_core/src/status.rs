//! Session status and the board the host reads it from.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use alarm_traits::AuthorizationStatus;
use crossbeam_channel as xch;

use crate::detector::MotionEvent;
use crate::error::AlarmError;

/// Public lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// Start requested; authorization or acquisition is in progress.
    #[default]
    Starting,
    /// Collecting samples and watching for motion.
    Monitoring,
    /// Authorization was denied or declined; the host may retry.
    NeedsAuthorization,
    /// The device has no health data store.
    DataSourceUnavailable,
    /// The device has no usable accelerometer.
    SensorUnavailable,
    /// Acquisition or the provider failed; the host may retry.
    Failed,
    /// Stopped by the host. Terminal.
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Starting => "starting",
            SessionStatus::Monitoring => "monitoring",
            SessionStatus::NeedsAuthorization => "needs_authorization",
            SessionStatus::DataSourceUnavailable => "data_source_unavailable",
            SessionStatus::SensorUnavailable => "sensor_unavailable",
            SessionStatus::Failed => "failed",
            SessionStatus::Ended => "ended",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Ended)
    }

    /// States that accept an explicit retry back to `Starting`.
    pub fn accepts_retry(&self) -> bool {
        matches!(
            self,
            SessionStatus::NeedsAuthorization | SessionStatus::Failed
        )
    }
}

impl core::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification sent to subscribers on every status transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub from: SessionStatus,
    pub to: SessionStatus,
    pub at: Instant,
    /// Error that caused the transition, if any.
    pub error: Option<AlarmError>,
}

/// Burst notification, numbered from 1 within a session. Sent for every burst,
/// so hosts can count bursts without polling the snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BurstNotice {
    Started {
        n: u64,
        magnitude: f64,
        pulses: usize,
        at: Instant,
    },
    /// Every pulse of burst `n` was played. Cancelled bursts never complete.
    Completed { n: u64 },
}

impl BurstNotice {
    pub fn n(&self) -> u64 {
        match self {
            BurstNotice::Started { n, .. } | BurstNotice::Completed { n } => *n,
        }
    }
}

/// Point-in-time view of the session, readable from any thread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub authorization: AuthorizationStatus,
    pub burst_active: bool,
    pub bursts_fired: u64,
    pub last_motion: Option<MotionEvent>,
    pub last_error: Option<AlarmError>,
}

impl SessionSnapshot {
    pub fn is_monitoring(&self) -> bool {
        self.status == SessionStatus::Monitoring
    }
}

/// Shared snapshot plus subscriber lists. The session writes; hosts read and subscribe.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    snapshot: Arc<Mutex<SessionSnapshot>>,
    subscribers: Arc<Mutex<Vec<xch::Sender<StatusChange>>>>,
    burst_subscribers: Arc<Mutex<Vec<xch::Sender<BurstNotice>>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.snapshot).clone()
    }

    pub fn status(&self) -> SessionStatus {
        lock(&self.snapshot).status
    }

    pub fn is_monitoring(&self) -> bool {
        lock(&self.snapshot).is_monitoring()
    }

    /// Receive every subsequent status transition. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> xch::Receiver<StatusChange> {
        let (tx, rx) = xch::unbounded();
        lock(&self.subscribers).push(tx);
        rx
    }

    /// Receive every subsequent burst start and completion.
    pub fn subscribe_bursts(&self) -> xch::Receiver<BurstNotice> {
        let (tx, rx) = xch::unbounded();
        lock(&self.burst_subscribers).push(tx);
        rx
    }

    pub(crate) fn publish(&self, snapshot: SessionSnapshot) {
        *lock(&self.snapshot) = snapshot;
    }

    pub(crate) fn notify(&self, change: &StatusChange) {
        lock(&self.subscribers).retain(|tx| tx.send(change.clone()).is_ok());
    }

    pub(crate) fn notify_burst(&self, notice: BurstNotice) {
        lock(&self.burst_subscribers).retain(|tx| tx.send(notice).is_ok());
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
