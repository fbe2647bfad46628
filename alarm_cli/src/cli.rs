//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "etc/alarm_config.toml";

#[derive(Parser, Debug)]
#[command(name = "alarm", version, about = "Wrist smart-alarm session (simulated platform)")]
pub struct Cli {
    /// Path to config TOML (default: etc/alarm_config.toml, if present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides logging.level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Three-step level for command-line overrides.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LevelArg {
    Low,
    Medium,
    High,
}

impl From<LevelArg> for alarm_config::Level {
    fn from(l: LevelArg) -> Self {
        match l {
            LevelArg::Low => alarm_config::Level::Low,
            LevelArg::Medium => alarm_config::Level::Medium,
            LevelArg::High => alarm_config::Level::High,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a monitoring session until stopped (Ctrl-C), a limit is hit, or it fails
    Run {
        /// Stop after this many seconds
        #[arg(long, value_name = "SECS")]
        duration_s: Option<u64>,
        /// Stop once this many bursts have played out
        #[arg(long, value_name = "N")]
        bursts: Option<u64>,
        /// Override detection.sensitivity
        #[arg(long, value_enum, value_name = "LEVEL")]
        sensitivity: Option<LevelArg>,
        /// Override haptics.intensity
        #[arg(long, value_enum, value_name = "LEVEL")]
        intensity: Option<LevelArg>,
        /// Override cooldown.seconds
        #[arg(long, value_name = "SECS")]
        cooldown_s: Option<u64>,
        /// Override alarm.wake_at: no burst before this local time (HH:MM)
        #[arg(long, value_name = "HH:MM", value_parser = parse_at)]
        at: Option<String>,
    },
    /// Check that authorization, data source and motion sensor are usable
    SelfCheck,
    /// Print the effective settings
    ShowConfig,
}

fn parse_at(s: &str) -> Result<String, String> {
    alarm_config::parse_wake_time(s)
        .map(|_| s.trim().to_string())
        .map_err(|e| e.to_string())
}
