//! Plain value types exchanged between the session core and its collaborators.

/// One three-axis accelerometer reading in g.
///
/// Samples carry no timestamp; the consumer stamps them with its own clock
/// at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Sample {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<(f64, f64, f64)> for Sample {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self { x, y, z }
    }
}

/// Shape of a single haptic pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PulseKind {
    #[default]
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

impl PulseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PulseKind::Notification => "notification",
            PulseKind::DirectionUp => "direction_up",
            PulseKind::DirectionDown => "direction_down",
            PulseKind::Success => "success",
            PulseKind::Failure => "failure",
            PulseKind::Retry => "retry",
            PulseKind::Start => "start",
            PulseKind::Stop => "stop",
            PulseKind::Click => "click",
        }
    }
}

/// Authorization to run a sensing session, as reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationStatus {
    Granted,
    Denied,
    #[default]
    Undetermined,
}

/// Lifecycle state reported by a sensing session through its delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensingState {
    NotStarted,
    Prepared,
    Running,
    Paused,
    Stopped,
    Ended,
}
