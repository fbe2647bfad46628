//! Actor thread that owns a `SessionMachine`.
//!
//! The host talks to the session only through `SessionHandle`: commands are
//! posted to the machine's mailbox and status is read back from the shared
//! `StatusBoard`. No call on the handle blocks on the session.
//!
//! Safety: the actor thread is shut down and joined when the handle is dropped.
use crossbeam_channel as xch;
use std::time::{Duration, Instant};

use crate::error::{AlarmError, Result};
use crate::event::SessionEvent;
use crate::session::SessionMachine;
use crate::status::{BurstNotice, SessionSnapshot, SessionStatus, StatusBoard, StatusChange};

pub struct SessionHandle {
    tx: xch::Sender<SessionEvent>,
    board: StatusBoard,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl core::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("status", &self.board.status())
            .finish()
    }
}

impl SessionHandle {
    /// Move `machine` onto its own thread and start draining its mailbox.
    pub fn spawn(mut machine: SessionMachine) -> Self {
        let tx = machine.mailbox();
        let rx = machine.receiver();
        let board = machine.board().clone();

        let join_handle = std::thread::spawn(move || {
            while let Ok(event) = rx.recv() {
                let shutdown = matches!(event, SessionEvent::Shutdown);
                machine.handle(event);
                if shutdown {
                    tracing::debug!("session actor received shutdown");
                    break;
                }
            }
            // Drain teardown callbacks already queued (end_collection completions).
            machine.pump();
            tracing::trace!("session actor exiting cleanly");
        });

        Self {
            tx,
            board,
            join_handle: Some(join_handle),
        }
    }

    pub fn attempt_start(&self) -> Result<()> {
        self.post(SessionEvent::AttemptStart)
    }

    pub fn retry_authorization(&self) -> Result<()> {
        self.post(SessionEvent::RetryAuthorization)
    }

    pub fn stop_session(&self) -> Result<()> {
        self.post(SessionEvent::Stop)
    }

    pub fn set_cooldown_not_before(&self, at: Option<Instant>) -> Result<()> {
        self.post(SessionEvent::SetCooldownNotBefore(at))
    }

    pub fn status(&self) -> SessionStatus {
        self.board.status()
    }

    pub fn is_monitoring(&self) -> bool {
        self.board.is_monitoring()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.board.snapshot()
    }

    pub fn subscribe(&self) -> xch::Receiver<StatusChange> {
        self.board.subscribe()
    }

    pub fn subscribe_bursts(&self) -> xch::Receiver<BurstNotice> {
        self.board.subscribe_bursts()
    }

    /// Poll the board until `pred` holds or `timeout` elapses. Returns the last snapshot seen.
    pub fn wait_for(
        &self,
        timeout: Duration,
        pred: impl Fn(&SessionSnapshot) -> bool,
    ) -> std::result::Result<SessionSnapshot, SessionSnapshot> {
        let deadline = Instant::now() + timeout;
        loop {
            let snap = self.board.snapshot();
            if pred(&snap) {
                return Ok(snap);
            }
            if Instant::now() >= deadline {
                return Err(snap);
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn post(&self, event: SessionEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| eyre::Report::new(AlarmError::State("session actor stopped".into())))
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(SessionEvent::Shutdown);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("session actor joined successfully"),
                Err(e) => tracing::warn!(?e, "session actor panicked during shutdown"),
            }
        }
    }
}
