use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Fast simulated wearer: moves right away and bursts play out in milliseconds.
const FAST: &str = r#"
[detection]
sensitivity = "high"
update_interval_ms = 10

[haptics]
intensity = "low"
pulse_interval_ms = 1

[cooldown]
seconds = 0

[simulation]
quiet_s = 0.0
motion_amplitude_g = 0.5
"#;

fn write_config(dir: &tempfile::TempDir, extra: &str) -> PathBuf {
    let path = dir.path().join("cfg.toml");
    fs::write(&path, format!("{FAST}{extra}")).unwrap();
    path
}

fn alarm(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("alarm_cli").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["show-config"], 0, "sensitivity: High", "stdout")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
#[case(&["run", "--bursts", "1", "--duration-s", "30"], 0, "burst 1 started", "stdout")]
#[case(&["run", "--sensitivity", "extreme"], 2, "invalid value", "stderr")]
#[case(&["run", "--at", "25:00"], 2, "HH:MM", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let out = alarm(&cfg).args(args).output().unwrap();

    assert_eq!(
        out.status.code(),
        Some(exit_code),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let text = if stream == "stdout" {
        String::from_utf8_lossy(&out.stdout).to_string()
    } else {
        String::from_utf8_lossy(&out.stderr).to_string()
    };
    assert!(text.contains(needle), "{needle:?} not in {stream}: {text}");
}

#[test]
fn run_reports_lifecycle_and_summary() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    alarm(&cfg)
        .args(["run", "--bursts", "1", "--duration-s", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("status: starting -> monitoring"))
        .stdout(predicate::str::contains("status: monitoring -> ended"))
        .stdout(predicate::str::contains("session ended: 1 burst(s)"));
}

#[test]
fn run_stops_at_duration_without_motion() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    // Quiet wearer: the whole run stays below the low threshold.
    fs::write(
        &cfg,
        "[detection]\nupdate_interval_ms = 10\n[simulation]\nquiet_s = 600.0\n",
    )
    .unwrap();
    alarm(&cfg)
        .args(["run", "--duration-s", "1", "--sensitivity", "low"])
        .assert()
        .success()
        .stdout(predicate::str::contains("session ended: 0 burst(s)"));
}

#[rstest]
#[case::denied("authorization = \"denied\"", 3, "authorization was denied")]
#[case::declined(
    "authorization = \"undetermined\"\ngrant_on_request = false",
    3,
    "authorization was denied"
)]
#[case::no_health_data("data_source_available = false", 4, "not available on this device")]
#[case::no_sensor("sensor_available = false", 5, "motion sensor is unavailable")]
#[case::session_refused("fail_session = true", 6, "workout session could not be started")]
fn run_failures_map_to_exit_codes(
    #[case] simulation: &str,
    #[case] code: i32,
    #[case] needle: &str,
) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, format!("[simulation]\n{simulation}\n")).unwrap();
    alarm(&path)
        .args(["run", "--duration-s", "10"])
        .assert()
        .code(code)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn undetermined_authorization_granted_on_prompt() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "authorization = \"undetermined\"\n");
    alarm(&cfg)
        .args(["run", "--bursts", "1", "--duration-s", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("monitoring"));
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[haptics]\npulse_interval_ms = 0\n").unwrap();
    alarm(&path)
        .arg("show-config")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.toml");
    alarm(&path)
        .arg("show-config")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not be read"));
}

#[test]
fn self_check_fails_without_sensor() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, "[simulation]\nsensor_available = false\n").unwrap();
    alarm(&path)
        .arg("self-check")
        .assert()
        .code(5)
        .stdout(predicate::str::contains("motion sensor: unavailable"));
}

#[test]
fn run_stops_after_exactly_the_requested_bursts() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let out = alarm(&cfg)
        .args(["run", "--bursts", "2", "--duration-s", "30"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("burst 1 started"), "{stdout}");
    assert!(stdout.contains("burst 2 started"), "{stdout}");
    assert!(!stdout.contains("burst 3 started"), "{stdout}");
    assert!(stdout.contains("session ended: 2 burst(s)"), "{stdout}");
}

#[test]
fn wake_time_holds_bursts_back() {
    let dir = tempdir().unwrap();
    let at = (chrono::Local::now() + chrono::TimeDelta::hours(2))
        .format("%H:%M")
        .to_string();
    let cfg = write_config(&dir, &format!("[alarm]\nwake_at = \"{at}\"\n"));
    alarm(&cfg)
        .args(["run", "--duration-s", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wake at "))
        .stdout(predicate::str::contains("session ended: 0 burst(s)"));
}
