//! Background burst timer.
//!
//! Spawns one thread per burst that waits for each pulse offset and posts
//! `SessionEvent::PulseDue` to the session mailbox. The thread never touches
//! session state; it only enqueues.
//!
//! Safety: each burst thread is joined when the burst is cancelled, replaced,
//! or the timer is dropped, so no timer thread outlives its `ThreadPulseTimer`.
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::burst::{BurstPlan, PulseTimer};
use crate::event::SessionEvent;

/// Wall-clock `PulseTimer` backed by one short-lived thread per burst.
#[derive(Default)]
pub struct ThreadPulseTimer {
    task: Option<TimerTask>,
}

impl ThreadPulseTimer {
    pub fn new() -> Self {
        Self { task: None }
    }

    /// Whether a burst thread is currently armed.
    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl PulseTimer for ThreadPulseTimer {
    fn schedule(&mut self, burst: u64, plan: BurstPlan, mailbox: xch::Sender<SessionEvent>) {
        // A previous burst has already posted its last pulse by now; reap its thread.
        if let Some(mut old) = self.task.take() {
            old.shutdown();
        }
        self.task = Some(TimerTask::spawn(burst, plan, mailbox));
    }

    fn cancel(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.shutdown();
        }
    }
}

impl Drop for ThreadPulseTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct TimerTask {
    cancelled: Arc<AtomicBool>,
    /// Dropping this sender wakes the thread out of its wait.
    wake: Option<xch::Sender<()>>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl TimerTask {
    fn spawn(burst: u64, plan: BurstPlan, mailbox: xch::Sender<SessionEvent>) -> Self {
        let (wake_tx, wake_rx) = xch::bounded::<()>(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancelled_clone = cancelled.clone();

        let join_handle = std::thread::spawn(move || {
            let start = Instant::now();
            for pulse in plan.pulses() {
                let wait = (start + pulse.offset).saturating_duration_since(Instant::now());
                if !wait.is_zero() {
                    match wake_rx.recv_timeout(wait) {
                        Err(xch::RecvTimeoutError::Timeout) => {}
                        // Woken or disconnected: the burst was cancelled.
                        Ok(()) | Err(xch::RecvTimeoutError::Disconnected) => {
                            tracing::debug!(burst, index = pulse.index, "burst timer cancelled");
                            break;
                        }
                    }
                }
                if cancelled_clone.load(Ordering::Relaxed) {
                    break;
                }
                let due = SessionEvent::PulseDue {
                    burst,
                    index: pulse.index,
                    kind: pulse.kind,
                };
                if mailbox.send(due).is_err() {
                    tracing::debug!(burst, "session mailbox closed, burst timer exiting");
                    break;
                }
            }
            tracing::trace!(burst, "burst timer thread exiting");
        });

        Self {
            cancelled,
            wake: Some(wake_tx),
            join_handle: Some(join_handle),
        }
    }

    fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(std::thread::JoinHandle::is_finished)
    }

    fn shutdown(&mut self) {
        self.cancelled.store(true, Ordering::Relaxed);
        drop(self.wake.take());
        if let Some(handle) = self.join_handle.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!(?e, "burst timer thread panicked during shutdown");
        }
    }
}

impl Drop for TimerTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}
