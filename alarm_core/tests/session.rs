//! Session lifecycle scenarios driven synchronously through `pump`.

use std::time::Duration;

use alarm_core::mocks::{
    FlagDataSource, ManualPulseTimer, ManualSampleSource, RecordingHaptics, ScriptedSensing,
    StubAuthorization,
};
use alarm_core::{
    AlarmError, AlarmSettings, BurstNotice, HapticIntensity, MAX_RETIRING_SESSIONS, Sensitivity,
    SessionBuilder, SessionMachine, SessionStatus, SettingsHandle,
};
use alarm_traits::clock::Clock;
use alarm_traits::clock::test_clock::TestClock;
use alarm_traits::{AuthorizationStatus, PulseKind, SensingState};

struct Rig {
    m: SessionMachine,
    auth: StubAuthorization,
    sensing: ScriptedSensing,
    samples: ManualSampleSource,
    haptics: RecordingHaptics,
    timer: ManualPulseTimer,
    clock: TestClock,
    settings: SettingsHandle,
}

impl Rig {
    fn with(
        auth: StubAuthorization,
        data: FlagDataSource,
        sensing: ScriptedSensing,
        samples: ManualSampleSource,
        settings: AlarmSettings,
    ) -> Self {
        let haptics = RecordingHaptics::default();
        let timer = ManualPulseTimer::new();
        let clock = TestClock::new();
        let settings = SettingsHandle::new(settings);
        let m = SessionBuilder::new()
            .with_authorization(auth.clone())
            .with_data_source(data)
            .with_sensing(sensing.clone())
            .with_samples(samples.clone())
            .with_haptics(haptics.clone())
            .with_clock(clock.clone())
            .with_settings(settings.clone())
            .with_pulse_timer(timer.clone())
            .build()
            .expect("build session");
        Self {
            m,
            auth,
            sensing,
            samples,
            haptics,
            timer,
            clock,
            settings,
        }
    }

    fn healthy() -> Self {
        Self::with(
            StubAuthorization::granted(),
            FlagDataSource::new(true),
            ScriptedSensing::succeeding(),
            ManualSampleSource::default(),
            AlarmSettings::default(),
        )
    }

    fn start(&mut self) {
        self.m.attempt_start();
        self.m.pump();
    }

    /// Feed a sample and process it.
    fn push(&mut self, x: f64, y: f64, z: f64) {
        assert!(self.samples.push(x, y, z), "no sample handler installed");
        self.m.pump();
    }

    fn fire_all(&mut self) -> usize {
        let n = self.timer.fire_all();
        self.m.pump();
        n
    }

    fn last_error(&self) -> Option<AlarmError> {
        self.m.snapshot().last_error
    }
}

#[test]
fn granted_start_reaches_monitoring() {
    let mut rig = Rig::healthy();
    assert_eq!(rig.m.status(), SessionStatus::Starting);
    rig.start();
    assert!(rig.m.is_monitoring());
    assert_eq!(rig.sensing.created(), 1);
    assert_eq!(rig.sensing.started(), 1);
    assert_eq!(rig.samples.starts(), 1);
    assert_eq!(rig.m.snapshot().authorization, AuthorizationStatus::Granted);
    assert_eq!(rig.last_error(), None);
}

#[test]
fn denied_authorization_needs_authorization_without_session() {
    let mut rig = Rig::with(
        StubAuthorization::new(AuthorizationStatus::Denied),
        FlagDataSource::new(true),
        ScriptedSensing::succeeding(),
        ManualSampleSource::default(),
        AlarmSettings::default(),
    );
    rig.start();
    assert_eq!(rig.m.status(), SessionStatus::NeedsAuthorization);
    assert_eq!(rig.last_error(), Some(AlarmError::AuthorizationDenied));
    assert_eq!(rig.sensing.created(), 0);
    assert_eq!(rig.auth.requests(), 0);
}

#[test]
fn undetermined_authorization_is_requested_then_granted() {
    let mut rig = Rig::with(
        StubAuthorization::new(AuthorizationStatus::Undetermined),
        FlagDataSource::new(true),
        ScriptedSensing::succeeding(),
        ManualSampleSource::default(),
        AlarmSettings::default(),
    );
    rig.start();
    assert_eq!(rig.m.status(), SessionStatus::Starting);
    assert_eq!(rig.auth.requests(), 1);

    // A second start while the prompt is open does not ask again.
    rig.start();
    assert_eq!(rig.auth.requests(), 1);

    rig.auth.resolve(true);
    rig.m.pump();
    assert!(rig.m.is_monitoring());
    assert_eq!(rig.m.snapshot().authorization, AuthorizationStatus::Granted);
}

#[test]
fn undetermined_authorization_declined() {
    let mut rig = Rig::with(
        StubAuthorization::answering(AuthorizationStatus::Undetermined, false),
        FlagDataSource::new(true),
        ScriptedSensing::succeeding(),
        ManualSampleSource::default(),
        AlarmSettings::default(),
    );
    rig.start();
    assert_eq!(rig.m.status(), SessionStatus::NeedsAuthorization);
    assert_eq!(rig.sensing.created(), 0);

    // The wearer grants access in settings, then retries.
    rig.auth.set_status(AuthorizationStatus::Granted);
    rig.m.retry_authorization();
    rig.m.pump();
    assert!(rig.m.is_monitoring());
}

#[test]
fn unavailable_data_source_blocks_start() {
    let mut rig = Rig::with(
        StubAuthorization::granted(),
        FlagDataSource::new(false),
        ScriptedSensing::succeeding(),
        ManualSampleSource::default(),
        AlarmSettings::default(),
    );
    rig.start();
    assert_eq!(rig.m.status(), SessionStatus::DataSourceUnavailable);
    assert_eq!(rig.last_error(), Some(AlarmError::DataSourceUnavailable));
    assert_eq!(rig.sensing.created(), 0);

    // Not a retryable state.
    rig.m.retry_authorization();
    rig.m.pump();
    assert_eq!(rig.m.status(), SessionStatus::DataSourceUnavailable);
}

#[test]
fn unavailable_sensor_blocks_start() {
    let mut rig = Rig::with(
        StubAuthorization::granted(),
        FlagDataSource::new(true),
        ScriptedSensing::succeeding(),
        ManualSampleSource::new(false),
        AlarmSettings::default(),
    );
    rig.start();
    assert_eq!(rig.m.status(), SessionStatus::SensorUnavailable);
    assert_eq!(rig.last_error(), Some(AlarmError::SensorUnavailable));
    assert_eq!(rig.sensing.created(), 0);
    assert_eq!(rig.samples.starts(), 0);
}

#[test]
fn session_acquisition_failure_is_failed_not_monitoring() {
    let mut rig = Rig::with(
        StubAuthorization::granted(),
        FlagDataSource::new(true),
        ScriptedSensing::failing_create(),
        ManualSampleSource::default(),
        AlarmSettings::default(),
    );
    rig.start();
    assert_eq!(rig.m.status(), SessionStatus::Failed);
    assert!(!rig.m.is_monitoring());
    assert!(matches!(
        rig.last_error(),
        Some(AlarmError::SessionAcquisition(_))
    ));
    assert_eq!(rig.samples.starts(), 0);
}

#[test]
fn collection_that_never_starts_fails_and_tears_down() {
    let mut rig = Rig::with(
        StubAuthorization::granted(),
        FlagDataSource::new(true),
        ScriptedSensing::collection(false),
        ManualSampleSource::default(),
        AlarmSettings::default(),
    );
    rig.start();
    assert_eq!(rig.m.status(), SessionStatus::Failed);
    assert_eq!(rig.sensing.stopped(), 1);
    assert_eq!(rig.sensing.collections_ended(), 1);
    assert_eq!(rig.sensing.finished(), 1);
    assert_eq!(rig.samples.starts(), 0);
}

#[test]
fn monitoring_waits_for_collection_to_begin() {
    let mut rig = Rig::with(
        StubAuthorization::granted(),
        FlagDataSource::new(true),
        ScriptedSensing::deferred(),
        ManualSampleSource::default(),
        AlarmSettings::default(),
    );
    rig.start();
    assert_eq!(rig.m.status(), SessionStatus::Starting);
    assert_eq!(rig.samples.starts(), 0);

    rig.sensing.complete_collection(true);
    rig.m.pump();
    assert!(rig.m.is_monitoring());
    assert_eq!(rig.samples.starts(), 1);
}

#[test]
fn first_sample_is_only_a_baseline() {
    let mut rig = Rig::healthy();
    rig.start();
    rig.push(3.0, 3.0, 3.0);
    assert_eq!(rig.timer.bursts(), 0);
    assert_eq!(rig.m.snapshot().last_motion, None);
}

#[test]
fn medium_sensitivity_detects_small_jolt() {
    let mut rig = Rig::healthy();
    rig.start();
    rig.push(0.0, 0.0, 0.0);
    rig.push(0.2, 0.0, 0.0);

    let snap = rig.m.snapshot();
    assert!(snap.burst_active);
    assert_eq!(snap.bursts_fired, 1);
    let motion = snap.last_motion.expect("motion recorded");
    assert!((motion.magnitude - 0.2).abs() < 1e-9);

    let scheduled = rig.timer.scheduled();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].1.len(), 25);
    assert_eq!(scheduled[0].1.interval(), Duration::from_millis(125));
}

#[test]
fn small_drift_is_not_motion() {
    let mut rig = Rig::healthy();
    rig.start();
    rig.push(0.0, 0.0, -1.0);
    rig.push(0.05, 0.05, -1.02);
    assert_eq!(rig.timer.bursts(), 0);
    assert!(!rig.m.burst_state().is_active());
}

#[test]
fn burst_plays_the_pattern_then_completes() {
    let mut rig = Rig::healthy();
    rig.start();
    rig.push(0.0, 0.0, 0.0);
    rig.push(0.2, 0.0, 0.0);

    assert_eq!(rig.fire_all(), 25);
    let played = rig.haptics.played();
    assert_eq!(played.len(), 25);
    assert_eq!(played[0], PulseKind::Notification);
    assert_eq!(played[1], PulseKind::DirectionUp);
    assert_eq!(played[24], PulseKind::Notification);
    assert!(!rig.m.snapshot().burst_active);
}

#[test]
fn no_second_burst_while_one_is_active() {
    let mut rig = Rig::healthy();
    rig.start();
    rig.push(0.0, 0.0, 0.0);
    rig.push(0.2, 0.0, 0.0);
    rig.clock.advance(Duration::from_secs(60));
    rig.push(0.0, 0.0, 0.0);
    rig.push(0.2, 0.0, 0.0);
    assert_eq!(rig.timer.bursts(), 1);

    // Motion during the burst did not count as a trigger, so the cooldown
    // still runs from the first one.
    assert_eq!(
        rig.m.cooldown_state().last_triggered_at,
        Some(rig.clock.origin())
    );
}

#[test]
fn cooldown_suppresses_until_window_elapses() {
    let mut rig = Rig::with(
        StubAuthorization::granted(),
        FlagDataSource::new(true),
        ScriptedSensing::succeeding(),
        ManualSampleSource::default(),
        AlarmSettings {
            cooldown: Duration::from_secs(30),
            ..AlarmSettings::default()
        },
    );
    rig.start();
    rig.push(0.0, 0.0, 0.0);
    rig.push(0.2, 0.0, 0.0);
    rig.fire_all();
    assert_eq!(rig.timer.bursts(), 1);

    rig.clock.advance(Duration::from_secs(10));
    rig.push(0.0, 0.0, 0.0);
    assert_eq!(rig.timer.bursts(), 1);
    assert_eq!(rig.m.snapshot().bursts_fired, 1);

    rig.clock.advance(Duration::from_secs(21));
    rig.push(0.2, 0.0, 0.0);
    assert_eq!(rig.timer.bursts(), 2);
    assert_eq!(rig.m.snapshot().bursts_fired, 2);
}

#[test]
fn not_before_override_holds_triggers_back() {
    let mut rig = Rig::healthy();
    rig.start();
    let not_before = rig.clock.now() + Duration::from_secs(20);
    rig.m.set_cooldown_not_before(Some(not_before));

    rig.push(0.0, 0.0, 0.0);
    rig.push(0.2, 0.0, 0.0);
    assert_eq!(rig.timer.bursts(), 0);

    rig.clock.advance(Duration::from_secs(20));
    rig.push(0.0, 0.0, 0.0);
    assert_eq!(rig.timer.bursts(), 1);
}

#[test]
fn clearing_not_before_reopens_the_gate() {
    let mut rig = Rig::healthy();
    rig.start();
    rig.m
        .set_cooldown_not_before(Some(rig.clock.now() + Duration::from_secs(600)));
    rig.m.set_cooldown_not_before(None);
    rig.push(0.0, 0.0, 0.0);
    rig.push(0.2, 0.0, 0.0);
    assert_eq!(rig.timer.bursts(), 1);
}

#[test]
fn sensitivity_change_applies_to_next_sample() {
    let mut rig = Rig::with(
        StubAuthorization::granted(),
        FlagDataSource::new(true),
        ScriptedSensing::succeeding(),
        ManualSampleSource::default(),
        AlarmSettings {
            sensitivity: Sensitivity::Low,
            ..AlarmSettings::default()
        },
    );
    rig.start();
    rig.push(0.0, 0.0, 0.0);
    rig.push(0.2, 0.0, 0.0);
    assert_eq!(rig.timer.bursts(), 0);

    rig.settings.set_sensitivity(Sensitivity::High);
    rig.settings.set_intensity(HapticIntensity::Low);
    rig.push(0.0, 0.0, 0.0);
    assert_eq!(rig.timer.bursts(), 1);
    assert_eq!(rig.timer.scheduled()[0].1.len(), 10);
}

#[test]
fn stop_during_burst_cancels_remaining_pulses() {
    let mut rig = Rig::healthy();
    rig.start();
    rig.push(0.0, 0.0, 0.0);
    rig.push(0.2, 0.0, 0.0);
    for _ in 0..3 {
        assert!(rig.timer.fire_next());
    }
    rig.m.pump();
    assert_eq!(rig.haptics.count(), 3);

    let cancels_before = rig.timer.cancels();
    rig.m.stop_session();
    rig.m.pump();
    assert_eq!(rig.m.status(), SessionStatus::Ended);
    assert!(rig.timer.cancels() > cancels_before);
    assert!(!rig.m.burst_state().is_active());

    // A pulse that was already in flight when the burst was cancelled.
    assert!(rig.timer.fire_next());
    rig.m.pump();
    assert_eq!(rig.haptics.count(), 3);
}

#[test]
fn stop_tears_down_in_order_and_is_final() {
    let mut rig = Rig::healthy();
    rig.start();
    rig.m.stop_session();
    rig.m.pump();

    assert_eq!(rig.m.status(), SessionStatus::Ended);
    assert_eq!(rig.samples.stops(), 1);
    assert_eq!(rig.sensing.stopped(), 1);
    assert_eq!(rig.sensing.collections_ended(), 1);
    assert_eq!(rig.sensing.finished(), 1);
    assert!(!rig.samples.push(1.0, 1.0, 1.0));

    // Idempotent, and nothing restarts an ended session.
    rig.m.stop_session();
    rig.m.attempt_start();
    rig.m.retry_authorization();
    rig.m.pump();
    assert_eq!(rig.m.status(), SessionStatus::Ended);
    assert_eq!(rig.sensing.created(), 1);
    assert_eq!(rig.sensing.finished(), 1);
}

#[test]
fn stop_before_start_ends_cleanly() {
    let mut rig = Rig::healthy();
    rig.m.stop_session();
    rig.m.pump();
    assert_eq!(rig.m.status(), SessionStatus::Ended);
    assert_eq!(rig.sensing.created(), 0);
    assert_eq!(rig.samples.stops(), 0);
}

#[test]
fn provider_error_fails_then_retry_recovers() {
    let mut rig = Rig::healthy();
    rig.start();
    rig.push(0.0, 0.0, 0.0);

    rig.sensing.emit_error("sensor fusion lost");
    rig.m.pump();
    assert_eq!(rig.m.status(), SessionStatus::Failed);
    assert_eq!(
        rig.last_error(),
        Some(AlarmError::ProviderRuntime("sensor fusion lost".into()))
    );
    assert_eq!(rig.samples.stops(), 1);
    assert_eq!(rig.sensing.finished(), 1);

    rig.m.retry_authorization();
    rig.m.pump();
    assert!(rig.m.is_monitoring());
    assert_eq!(rig.sensing.created(), 2);
    assert_eq!(rig.last_error(), None);

    // Fresh baseline after the restart.
    rig.push(0.2, 0.0, 0.0);
    assert_eq!(rig.timer.bursts(), 0);
}

#[test]
fn provider_ending_unexpectedly_is_a_failure() {
    let mut rig = Rig::healthy();
    rig.start();
    rig.sensing.emit_state(SensingState::Running);
    rig.m.pump();
    assert!(rig.m.is_monitoring());

    rig.sensing.emit_state(SensingState::Ended);
    rig.m.pump();
    assert_eq!(rig.m.status(), SessionStatus::Failed);
    assert!(matches!(
        rig.last_error(),
        Some(AlarmError::ProviderRuntime(_))
    ));
}

#[test]
fn provider_callbacks_after_stop_are_ignored() {
    let mut rig = Rig::healthy();
    rig.start();
    rig.m.stop_session();
    rig.sensing.emit_error("late");
    rig.sensing.emit_state(SensingState::Stopped);
    rig.m.pump();
    assert_eq!(rig.m.status(), SessionStatus::Ended);
    assert_eq!(rig.last_error(), None);
}

#[test]
fn status_changes_are_broadcast() {
    let mut rig = Rig::healthy();
    let rx = rig.m.board().subscribe();
    rig.start();
    rig.m.stop_session();

    let changes: Vec<_> = rx.try_iter().map(|c| (c.from, c.to)).collect();
    assert_eq!(
        changes,
        vec![
            (SessionStatus::Starting, SessionStatus::Monitoring),
            (SessionStatus::Monitoring, SessionStatus::Ended),
        ]
    );
    assert_eq!(rig.m.board().status(), SessionStatus::Ended);
}

#[test]
fn failure_change_carries_the_error() {
    let mut rig = Rig::with(
        StubAuthorization::new(AuthorizationStatus::Denied),
        FlagDataSource::new(true),
        ScriptedSensing::succeeding(),
        ManualSampleSource::default(),
        AlarmSettings::default(),
    );
    let rx = rig.m.board().subscribe();
    rig.start();
    let change = rx.try_recv().expect("one change");
    assert_eq!(change.to, SessionStatus::NeedsAuthorization);
    assert_eq!(change.error, Some(AlarmError::AuthorizationDenied));
}

#[test]
fn every_burst_is_announced_with_its_number() {
    let mut rig = Rig::with(
        StubAuthorization::granted(),
        FlagDataSource::new(true),
        ScriptedSensing::succeeding(),
        ManualSampleSource::default(),
        AlarmSettings {
            cooldown: Duration::ZERO,
            intensity: HapticIntensity::Low,
            ..AlarmSettings::default()
        },
    );
    let bursts = rig.m.board().subscribe_bursts();
    rig.start();
    rig.push(0.0, 0.0, 0.0);
    for _ in 0..3 {
        rig.push(1.0, 0.0, 0.0);
        rig.fire_all();
        rig.push(0.0, 0.0, 0.0);
        rig.fire_all();
    }

    let notices: Vec<_> = bursts.try_iter().collect();
    let started: Vec<u64> = notices
        .iter()
        .filter(|b| matches!(b, BurstNotice::Started { .. }))
        .map(BurstNotice::n)
        .collect();
    let completed: Vec<u64> = notices
        .iter()
        .filter(|b| matches!(b, BurstNotice::Completed { .. }))
        .map(BurstNotice::n)
        .collect();
    // Both the jolt and the return to rest trigger.
    assert_eq!(rig.m.snapshot().bursts_fired, 6);
    assert_eq!(started, (1..=6).collect::<Vec<_>>());
    assert_eq!(completed, started);
    assert!(matches!(
        notices[0],
        BurstNotice::Started { n: 1, pulses: 10, .. }
    ));
}

#[test]
fn cancelled_burst_is_never_completed() {
    let mut rig = Rig::healthy();
    let bursts = rig.m.board().subscribe_bursts();
    rig.start();
    rig.push(0.0, 0.0, 0.0);
    rig.push(1.0, 0.0, 0.0);
    rig.m.stop_session();
    rig.fire_all();
    let notices: Vec<_> = bursts.try_iter().collect();
    assert_eq!(notices.len(), 1);
    assert!(matches!(notices[0], BurstNotice::Started { n: 1, .. }));
}

#[test]
fn update_interval_change_applies_on_next_start() {
    let mut rig = Rig::healthy();
    rig.start();
    assert_eq!(
        rig.samples.last_interval(),
        Some(AlarmSettings::default().update_interval)
    );

    rig.settings
        .update(|s| s.update_interval = Duration::from_millis(250));
    rig.sensing.emit_error("sensor fusion lost");
    rig.m.pump();
    rig.m.retry_authorization();
    rig.m.pump();
    assert!(rig.m.is_monitoring());
    assert_eq!(rig.samples.starts(), 2);
    assert_eq!(rig.samples.last_interval(), Some(Duration::from_millis(250)));
}

#[test]
fn sessions_stuck_ending_are_finished_past_the_cap() {
    let mut rig = Rig::with(
        StubAuthorization::granted(),
        FlagDataSource::new(true),
        ScriptedSensing::stuck_ending(),
        ManualSampleSource::default(),
        AlarmSettings::default(),
    );
    rig.start();
    let failures = MAX_RETIRING_SESSIONS + 2;
    for _ in 0..failures {
        rig.sensing.emit_error("sensor fusion lost");
        rig.m.pump();
        assert_eq!(rig.m.status(), SessionStatus::Failed);
        rig.m.retry_authorization();
        rig.m.pump();
        assert!(rig.m.is_monitoring());
    }
    assert_eq!(rig.sensing.collections_ended(), failures);
    assert_eq!(rig.m.retiring_sessions(), MAX_RETIRING_SESSIONS);
    assert_eq!(rig.sensing.finished(), failures - MAX_RETIRING_SESSIONS);
}
