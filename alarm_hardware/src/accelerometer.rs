//! Simulated accelerometer.
//!
//! `start_updates` spawns one thread that delivers a sample from the
//! `MotionProfile` every requested interval until `stop_updates` (or drop).
//!
//! Safety: the update thread is shut down and joined before a new one starts
//! and when the accelerometer is dropped, so threads never leak.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use alarm_traits::clock::{Clock, MonotonicClock};
use alarm_traits::{SampleHandler, SampleSource};
use crossbeam_channel as xch;

use crate::profile::{AT_REST, MotionProfile};

struct Updates {
    shutdown: Arc<AtomicBool>,
    // Dropping the sender wakes the thread out of its interval wait.
    wake: Option<xch::Sender<()>>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Updates {
    fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.wake.take();
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("accelerometer thread joined successfully"),
                Err(e) => tracing::warn!(?e, "accelerometer thread panicked during shutdown"),
            }
        }
    }
}

pub struct SimAccelerometer {
    available: bool,
    profile: MotionProfile,
    warmup_sample: bool,
    delivered: Arc<AtomicU64>,
    updates: Option<Updates>,
}

impl SimAccelerometer {
    pub fn new(profile: MotionProfile) -> Self {
        Self {
            available: true,
            profile,
            warmup_sample: false,
            delivered: Arc::new(AtomicU64::new(0)),
            updates: None,
        }
    }

    /// An accelerometer the device does not have.
    pub fn unavailable() -> Self {
        let mut accel = Self::new(MotionProfile::still());
        accel.available = false;
        accel
    }

    /// Deliver one resting sample as soon as updates start.
    pub fn with_warmup_sample(mut self, on: bool) -> Self {
        self.warmup_sample = on;
        self
    }

    /// Samples handed to the handler so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

impl SampleSource for SimAccelerometer {
    fn is_available(&self) -> bool {
        self.available
    }

    fn is_active(&self) -> bool {
        self.updates.is_some()
    }

    fn start_updates(&mut self, interval: Duration, mut handler: SampleHandler) {
        if !self.available {
            tracing::warn!("start_updates on an unavailable accelerometer");
            return;
        }
        if let Some(mut old) = self.updates.take() {
            old.shutdown();
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let (wake_tx, wake_rx) = xch::bounded::<()>(0);
        let delivered = self.delivered.clone();
        let profile = self.profile;
        let warmup = self.warmup_sample;

        let join_handle = std::thread::spawn(move || {
            let clock = MonotonicClock::new();
            let epoch = clock.now();
            if warmup {
                handler(AT_REST);
                delivered.fetch_add(1, Ordering::Relaxed);
            }
            let mut tick = 0u64;
            loop {
                match wake_rx.recv_timeout(interval) {
                    Err(xch::RecvTimeoutError::Timeout) => {}
                    _ => break,
                }
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                handler(profile.sample_at(clock.since(epoch), tick));
                delivered.fetch_add(1, Ordering::Relaxed);
                tick += 1;
            }
            tracing::trace!(tick, "accelerometer thread exiting cleanly");
        });

        tracing::debug!(interval_ms = interval.as_millis() as u64, "accelerometer updates started");
        self.updates = Some(Updates {
            shutdown,
            wake: Some(wake_tx),
            join_handle: Some(join_handle),
        });
    }

    fn stop_updates(&mut self) {
        if let Some(mut updates) = self.updates.take() {
            updates.shutdown();
            tracing::debug!("accelerometer updates stopped");
        }
    }
}

impl Drop for SimAccelerometer {
    fn drop(&mut self) {
        self.stop_updates();
    }
}
