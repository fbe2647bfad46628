pub mod clock;
pub mod types;

pub use clock::{Clock, MonotonicClock};
pub use types::{AuthorizationStatus, PulseKind, Sample, SensingState};

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Error type returned by collaborator implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One-shot completion callback; may be invoked from any thread.
pub type Completion<T> = Box<dyn FnOnce(T) + Send>;

/// Per-sample callback installed by `SampleSource::start_updates`.
pub type SampleHandler = Box<dyn FnMut(Sample) + Send>;

pub trait AuthorizationProvider: Send {
    fn current_status(&self) -> AuthorizationStatus;
    /// Ask the user for authorization; `done(true)` means granted.
    fn request_authorization(&mut self, done: Completion<bool>);
}

/// Whether the platform's health/workout data store exists on this device.
pub trait DataSource: Send {
    fn is_available(&self) -> bool;
}

/// Receives asynchronous notifications from a live sensing session.
pub trait SessionDelegate: Send + Sync {
    fn on_state_change(&self, state: SensingState, at: Instant);
    fn on_error(&self, error: BoxError);
}

pub trait SensingSessionFactory: Send {
    fn create(
        &mut self,
        delegate: Arc<dyn SessionDelegate>,
    ) -> Result<Box<dyn SensingSession>, BoxError>;
}

/// Platform session that keeps the device sensing in the background.
pub trait SensingSession: Send {
    fn start(&mut self);
    fn stop(&mut self);
    fn begin_collection(&mut self, done: Completion<bool>);
    fn end_collection(&mut self, done: Completion<bool>);
    fn finish(&mut self, done: Completion<bool>);
}

/// Accelerometer feed. Handlers run on the source's own delivery thread.
/// `interval` is the requested time between samples for this run of updates.
pub trait SampleSource: Send {
    fn is_available(&self) -> bool;
    fn is_active(&self) -> bool;
    fn start_updates(&mut self, interval: Duration, handler: SampleHandler);
    fn stop_updates(&mut self);
}

/// Fire-and-forget haptic output.
pub trait Haptics: Send {
    fn play(&mut self, kind: PulseKind);
}
