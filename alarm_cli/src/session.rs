//! Session assembly on the simulated platform and the `run` loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use alarm_config::{Config, SimAuthorization as SimAuthConfig};
use alarm_core::error::{AlarmError, Result as CoreResult};
use alarm_core::{
    AlarmSettings, BurstNotice, SessionBuilder, SessionHandle, SessionStatus, StatusChange,
};
use alarm_hardware::{
    LoggedHaptics, MotionProfile, SimAccelerometer, SimAuthorization, SimDataSource,
    SimSensingFactory,
};
use alarm_traits::{AuthorizationProvider, AuthorizationStatus, DataSource, SampleSource};
use chrono::NaiveDateTime;
use crossbeam_channel as xch;
use serde_json::json;

use crate::wake;

const POLL: Duration = Duration::from_millis(50);
const STOP_GRACE: Duration = Duration::from_secs(5);
const LIMIT_HOLD: Duration = Duration::from_secs(24 * 60 * 60);

/// Limits and overrides for one `run`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunParams {
    pub duration: Option<Duration>,
    pub max_bursts: Option<u64>,
}

pub struct SimPlatform {
    pub authorization: SimAuthorization,
    pub data_source: SimDataSource,
    pub sensing: SimSensingFactory,
    pub samples: SimAccelerometer,
    pub haptics: LoggedHaptics,
}

/// Build the simulated collaborators described by `[simulation]`.
pub fn sim_platform(cfg: &Config) -> SimPlatform {
    let sim = &cfg.simulation;
    let status = match sim.authorization {
        SimAuthConfig::Granted => AuthorizationStatus::Granted,
        SimAuthConfig::Denied => AuthorizationStatus::Denied,
        SimAuthConfig::Undetermined => AuthorizationStatus::Undetermined,
    };
    let samples = if sim.sensor_available {
        SimAccelerometer::new(MotionProfile {
            quiet: Duration::from_secs_f64(sim.quiet_s),
            amplitude: sim.motion_amplitude_g,
        })
        .with_warmup_sample(sim.warmup_sample)
    } else {
        SimAccelerometer::unavailable()
    };
    SimPlatform {
        authorization: SimAuthorization::new(status, sim.grant_on_request),
        data_source: SimDataSource {
            available: sim.data_source_available,
        },
        sensing: if sim.fail_session {
            SimSensingFactory::refusing()
        } else {
            SimSensingFactory::new()
        },
        samples,
        haptics: LoggedHaptics::new(),
    }
}

/// Report whether the simulated platform could run a session.
pub fn self_check(cfg: &Config, json_mode: bool) -> CoreResult<()> {
    let p = sim_platform(cfg);
    let authorization = p.authorization.current_status();
    let data = p.data_source.is_available();
    let sensor = p.samples.is_available();
    if json_mode {
        println!(
            "{}",
            json!({
                "authorization": format!("{authorization:?}").to_lowercase(),
                "data_source_available": data,
                "sensor_available": sensor,
            })
        );
    } else {
        println!("authorization: {authorization:?}");
        println!("data source: {}", if data { "available" } else { "unavailable" });
        println!("motion sensor: {}", if sensor { "available" } else { "unavailable" });
    }
    if !data {
        return Err(eyre::Report::new(AlarmError::DataSourceUnavailable));
    }
    if !sensor {
        return Err(eyre::Report::new(AlarmError::SensorUnavailable));
    }
    if authorization == AuthorizationStatus::Denied {
        return Err(eyre::Report::new(AlarmError::AuthorizationDenied));
    }
    if !json_mode {
        println!("self-check ok");
    }
    Ok(())
}

/// Print the effective settings.
pub fn show_config(cfg: &Config, settings: &AlarmSettings, json_mode: bool) {
    let pattern: Vec<&str> = settings.pattern.iter().map(|k| k.as_str()).collect();
    if json_mode {
        println!(
            "{}",
            json!({
                "sensitivity": format!("{:?}", settings.sensitivity).to_lowercase(),
                "threshold_g": settings.sensitivity.threshold_g(),
                "intensity": format!("{:?}", settings.intensity).to_lowercase(),
                "burst_pulses": settings.intensity.burst_count(),
                "pulse_interval_ms": settings.pulse_interval.as_millis() as u64,
                "pattern": pattern,
                "cooldown_s": settings.cooldown.as_secs(),
                "not_before_s": cfg.cooldown.not_before_s,
                "wake_at": cfg.alarm.wake_at,
                "update_interval_ms": settings.update_interval.as_millis() as u64,
            })
        );
    } else {
        println!(
            "sensitivity: {:?} ({} g)",
            settings.sensitivity,
            settings.sensitivity.threshold_g()
        );
        println!(
            "intensity: {:?} ({} pulses every {} ms)",
            settings.intensity,
            settings.intensity.burst_count(),
            settings.pulse_interval.as_millis()
        );
        println!("pattern: {}", pattern.join(", "));
        println!("cooldown: {} s", settings.cooldown.as_secs());
        if let Some(nb) = cfg.cooldown.not_before_s {
            println!("not before: {nb} s after start");
        }
        if let Some(at) = cfg.alarm.wake_at.as_deref() {
            println!("wake at: {at}");
        }
        println!("update interval: {} ms", settings.update_interval.as_millis());
    }
}

fn report_change(change: &StatusChange, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            json!({
                "event": "status",
                "from": change.from.as_str(),
                "to": change.to.as_str(),
                "error": change.error.as_ref().map(ToString::to_string),
            })
        );
    } else {
        match &change.error {
            Some(e) => println!("status: {} -> {} ({e})", change.from, change.to),
            None => println!("status: {} -> {}", change.from, change.to),
        }
    }
}

fn report_burst(n: u64, magnitude: f64, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            json!({ "event": "burst", "n": n, "magnitude_g": magnitude })
        );
    } else {
        println!("burst {n} started (motion {magnitude:.3} g)");
    }
}

fn report_wake(at: NaiveDateTime, wait: Duration, json_mode: bool) {
    let when = at.format("%Y-%m-%d %H:%M").to_string();
    if json_mode {
        println!(
            "{}",
            json!({ "event": "scheduled", "wake_at": when, "in_s": wait.as_secs() })
        );
    } else {
        println!("wake at {when} (in {} s)", wait.as_secs());
    }
}

/// Latest of `cooldown.not_before_s` and the next `alarm.wake_at`.
fn initial_hold(cfg: &Config, started: Instant, json_mode: bool) -> CoreResult<Option<Instant>> {
    let offset = cfg
        .cooldown
        .not_before_s
        .map(|secs| started + Duration::from_secs(secs));
    let wake = match cfg.alarm.wake_time()? {
        Some(at) => {
            let (when, wait) = wake::from_local_now(at);
            report_wake(when, wait, json_mode);
            Some(started + wait)
        }
        None => None,
    };
    Ok(offset.max(wake))
}

enum Step {
    Continue,
    Stop,
    Fail(AlarmError),
}

fn failure(change: &StatusChange) -> Option<AlarmError> {
    match change.to {
        SessionStatus::NeedsAuthorization
        | SessionStatus::DataSourceUnavailable
        | SessionStatus::SensorUnavailable
        | SessionStatus::Failed => Some(
            change
                .error
                .clone()
                .unwrap_or_else(|| AlarmError::State(format!("session {}", change.to))),
        ),
        _ => None,
    }
}

/// Run a session on the simulated platform until a limit, Ctrl-C, or failure.
pub fn run(
    cfg: &Config,
    settings: AlarmSettings,
    params: RunParams,
    shutdown: Arc<AtomicBool>,
    json_mode: bool,
) -> CoreResult<u64> {
    settings
        .validate()
        .map_err(eyre::Report::new)?;
    let p = sim_platform(cfg);
    let handle: SessionHandle = SessionBuilder::new()
        .with_authorization(p.authorization)
        .with_data_source(p.data_source)
        .with_sensing(p.sensing)
        .with_samples(p.samples)
        .with_haptics(p.haptics)
        .with_settings(alarm_core::SettingsHandle::new(settings))
        .spawn()?;

    let changes = handle.subscribe();
    let bursts = handle.subscribe_bursts();
    let started = Instant::now();
    handle.attempt_start()?;
    if let Some(hold) = initial_hold(cfg, started, json_mode)? {
        handle.set_cooldown_not_before(Some(hold))?;
    }

    let deadline = params.duration.map(|d| started + d);
    let at_limit = |n: u64| params.max_bursts.is_some_and(|max| n >= max);
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("interrupted, stopping session");
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::info!("run duration reached");
            break;
        }
        let step = xch::select! {
            recv(changes) -> msg => match msg {
                Ok(change) => {
                    report_change(&change, json_mode);
                    failure(&change).map_or(Step::Continue, Step::Fail)
                }
                Err(_) => Step::Stop,
            },
            recv(bursts) -> msg => match msg {
                Ok(BurstNotice::Started { n, magnitude, .. }) => {
                    report_burst(n, magnitude, json_mode);
                    if at_limit(n) {
                        // Last burst: hold new triggers while it plays out.
                        handle.set_cooldown_not_before(Some(Instant::now() + LIMIT_HOLD))?;
                    }
                    Step::Continue
                }
                Ok(BurstNotice::Completed { n }) if at_limit(n) => {
                    tracing::info!(bursts = n, "burst limit reached");
                    Step::Stop
                }
                Ok(BurstNotice::Completed { .. }) => Step::Continue,
                Err(_) => Step::Stop,
            },
            default(POLL) => Step::Continue,
        };
        match step {
            Step::Continue => {}
            Step::Stop => break,
            Step::Fail(err) => return Err(eyre::Report::new(err)),
        }
    }

    handle.stop_session()?;
    while let Ok(change) = changes.recv_timeout(STOP_GRACE) {
        report_change(&change, json_mode);
        if change.to == SessionStatus::Ended {
            break;
        }
    }
    let end = handle.snapshot();
    if json_mode {
        println!(
            "{}",
            json!({ "event": "summary", "status": end.status.as_str(), "bursts": end.bursts_fired })
        );
    } else {
        println!("session {}: {} burst(s)", end.status, end.bursts_fired);
    }
    Ok(end.bursts_fired)
}
