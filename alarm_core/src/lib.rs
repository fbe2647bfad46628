#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core smart-alarm logic (platform-agnostic).
//!
//! All platform interactions go through the collaborator traits in
//! `alarm_traits`: authorization, data source, sensing session, sample source,
//! haptics and clock.
//!
//! ## Architecture
//!
//! - **Signal**: motion delta between consecutive samples (`signal` module)
//! - **Detection**: threshold comparison against the active sensitivity (`detector`)
//! - **Cooldown**: trigger suppression window and not-before override (`cooldown`)
//! - **Bursts**: pulse planning and the non-blocking timer (`burst`, `timer`)
//! - **Session**: lifecycle state machine owning all mutable state (`session`)
//! - **Runner**: actor thread and host handle (`runner`)
//!
//! Data flows samples → signal → detector → cooldown → burst. Every mutation
//! is serialized through the session mailbox.

pub mod builder;
pub mod burst;
pub mod config;
pub mod conversions;
pub mod cooldown;
pub mod detector;
pub mod error;
pub mod event;
pub mod mocks;
pub mod runner;
pub mod session;
pub mod signal;
pub mod status;
pub mod timer;

pub use builder::SessionBuilder;
pub use burst::{BurstPlan, BurstState, PulseTimer, ScheduledPulse};
pub use config::{AlarmSettings, HapticIntensity, Sensitivity, SettingsHandle};
pub use cooldown::{CooldownState, can_trigger};
pub use detector::{MotionEvent, is_motion};
pub use error::{AlarmError, BuildError, Report, Result};
pub use event::SessionEvent;
pub use runner::SessionHandle;
pub use session::{Collaborators, MAX_RETIRING_SESSIONS, SessionMachine};
pub use signal::delta;
pub use status::{BurstNotice, SessionSnapshot, SessionStatus, StatusBoard, StatusChange};
pub use timer::ThreadPulseTimer;
