//! Messages delivered to the session's single mutation entry point.

use std::time::Instant;

use alarm_traits::{PulseKind, Sample, SensingState};

/// Everything that can change session state, from the host or from a collaborator.
///
/// Collaborator-originated variants carry the attempt (or burst) generation
/// they were created for; the session drops any that no longer match.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    // Host commands
    AttemptStart,
    RetryAuthorization,
    Stop,
    SetCooldownNotBefore(Option<Instant>),

    // Collaborator callbacks
    AuthorizationResolved { attempt: u64, granted: bool },
    CollectionStarted { attempt: u64, success: bool },
    CollectionEnded { attempt: u64, success: bool },
    ProviderStateChanged { attempt: u64, state: SensingState, at: Instant },
    ProviderFailed { attempt: u64, reason: String },
    Sample { attempt: u64, sample: Sample },

    // Burst timer
    PulseDue { burst: u64, index: usize, kind: PulseKind },

    /// Stop the actor loop. Handled by the runner; the machine only tears down.
    Shutdown,
}
