//! Human-readable error descriptions and structured JSON error formatting.

use alarm_core::error::{AlarmError, BuildError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            other => format!(
                "What happened: The session could not be assembled ({other}).\nLikely causes: A platform collaborator failed to initialize.\nHow to fix: Re-run with --log-level=debug for details."
            ),
        };
    }

    if let Some(ae) = err.downcast_ref::<AlarmError>() {
        return match ae {
            AlarmError::AuthorizationDenied => "What happened: Health data authorization was denied.\nLikely causes: The wearer declined the prompt or revoked access.\nHow to fix: Grant access (simulation.authorization = \"granted\" or grant_on_request = true), then retry.".to_string(),
            AlarmError::DataSourceUnavailable => "What happened: Health data is not available on this device.\nLikely causes: The platform has no health store.\nHow to fix: Nothing to retry; run on a supported device (simulation.data_source_available).".to_string(),
            AlarmError::SensorUnavailable => "What happened: The motion sensor is unavailable.\nLikely causes: The device has no accelerometer or it is in use.\nHow to fix: Nothing to retry; check simulation.sensor_available.".to_string(),
            AlarmError::SessionAcquisition(why) => format!(
                "What happened: A workout session could not be started ({why}).\nLikely causes: Another workout is running or the platform refused the session.\nHow to fix: End other workouts and retry."
            ),
            AlarmError::ProviderRuntime(why) => format!(
                "What happened: The workout session failed while monitoring ({why}).\nLikely causes: The platform ended the session.\nHow to fix: Start a new run."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("invalid configuration") || lower.contains(" must ") || lower.contains("unreasonably") {
        return format!(
            "What happened: Configuration is invalid.\nLikely causes: Unknown keys or values, or out-of-range numbers.\nHow to fix: Edit the TOML config and try again. Detail: {msg}"
        );
    }

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Check the path. Detail: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable name for typed errors, used as the JSON `reason`.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<AlarmError>() {
        Some(AlarmError::AuthorizationDenied) => "AuthorizationDenied",
        Some(AlarmError::DataSourceUnavailable) => "DataSourceUnavailable",
        Some(AlarmError::SensorUnavailable) => "SensorUnavailable",
        Some(AlarmError::SessionAcquisition(_)) => "SessionAcquisition",
        Some(AlarmError::ProviderRuntime(_)) => "ProviderRuntime",
        Some(AlarmError::Config(_)) => "Config",
        Some(AlarmError::State(_)) => "State",
        None => "Error",
    }
}

/// Map session failures to stable exit codes; anything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<AlarmError>() {
        Some(AlarmError::AuthorizationDenied) => 3,
        Some(AlarmError::DataSourceUnavailable) => 4,
        Some(AlarmError::SensorUnavailable) => 5,
        Some(AlarmError::SessionAcquisition(_) | AlarmError::ProviderRuntime(_)) => 6,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let retryable = err
        .downcast_ref::<AlarmError>()
        .map(AlarmError::is_retryable);
    let mut obj = json!({ "reason": reason_name(err), "message": humanize(err) });
    if let Some(r) = retryable {
        obj["retryable"] = json!(r);
    }
    obj.to_string()
}
