#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

mod cli;
mod error_fmt;
mod logging;
mod session;
mod wake;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;

use crate::cli::{Cli, Commands, DEFAULT_CONFIG, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::session::RunParams;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if !cli.json {
        let _ = color_eyre::install();
    }

    if let Err(e) = real_main(cli) {
        tracing::debug!(error = ?e, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

/// Explicit `--config` must exist; the default path is optional.
fn load_config(path: Option<&Path>) -> eyre::Result<alarm_config::Config> {
    match path {
        Some(p) => alarm_config::load_file(p),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if default.exists() {
                alarm_config::load_file(&default)
            } else {
                Ok(alarm_config::Config::default())
            }
        }
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let mut cfg = load_config(cli.config.as_deref())?;
    logging::init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    match cli.cmd {
        Commands::Run {
            duration_s,
            bursts,
            sensitivity,
            intensity,
            cooldown_s,
            at,
        } => {
            if let Some(s) = sensitivity {
                cfg.detection.sensitivity = s.into();
            }
            if let Some(i) = intensity {
                cfg.haptics.intensity = i.into();
            }
            if let Some(c) = cooldown_s {
                cfg.cooldown.seconds = c;
            }
            if at.is_some() {
                cfg.alarm.wake_at = at;
            }
            cfg.validate()?;

            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            }

            let settings = alarm_core::AlarmSettings::from(&cfg);
            let params = RunParams {
                duration: duration_s.map(Duration::from_secs),
                max_bursts: bursts,
            };
            session::run(&cfg, settings, params, shutdown, cli.json)?;
        }
        Commands::SelfCheck => session::self_check(&cfg, cli.json)?,
        Commands::ShowConfig => {
            let settings = alarm_core::AlarmSettings::from(&cfg);
            session::show_config(&cfg, &settings, cli.json);
        }
    }
    Ok(())
}
