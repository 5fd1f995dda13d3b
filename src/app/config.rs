use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::error::AppError;

/// Failed disable strategies are never retried faster than this.
pub const MIN_STRATEGY_PAUSE_MS: u64 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AdbSettings {
    pub command_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingSettings {
    pub command_timeout_secs: u64,
    pub strategy_pause_ms: u64,
    pub settings_commit_ms: u64,
    pub ready_poll_interval_ms: u64,
    pub boot_settle_ms: u64,
    pub ready_timeout_minutes: u32,
    pub validation_settle_ms: u64,
    pub wake_settle_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            command_timeout_secs: 30,
            strategy_pause_ms: 1_000,
            settings_commit_ms: 2_000,
            ready_poll_interval_ms: 5_000,
            boot_settle_ms: 10_000,
            ready_timeout_minutes: 5,
            validation_settle_ms: 3_000,
            wake_settle_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OrchestrationSettings {
    /// Record a failure when post-reboot validation does not confirm removal.
    pub strict_validation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    pub log_level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub adb: AdbSettings,
    #[serde(default)]
    pub timing: TimingSettings,
    #[serde(default)]
    pub orchestration: OrchestrationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Durations the orchestration sleeps and waits on, resolved from [`TimingSettings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub command_timeout: Duration,
    pub strategy_pause: Duration,
    pub settings_commit: Duration,
    pub ready_poll_interval: Duration,
    pub boot_settle: Duration,
    pub ready_timeout_minutes: u32,
    pub validation_settle: Duration,
    pub wake_settle: Duration,
}

impl From<&TimingSettings> for Timing {
    fn from(settings: &TimingSettings) -> Self {
        Self {
            command_timeout: Duration::from_secs(settings.command_timeout_secs),
            strategy_pause: Duration::from_millis(settings.strategy_pause_ms),
            settings_commit: Duration::from_millis(settings.settings_commit_ms),
            ready_poll_interval: Duration::from_millis(settings.ready_poll_interval_ms),
            boot_settle: Duration::from_millis(settings.boot_settle_ms),
            ready_timeout_minutes: settings.ready_timeout_minutes,
            validation_settle: Duration::from_millis(settings.validation_settle_ms),
            wake_settle: Duration::from_millis(settings.wake_settle_ms),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Timing::from(&TimingSettings::default())
    }
}

#[cfg(test)]
impl Timing {
    /// No sleeps at all, for driving the state machine against a scripted bridge.
    pub fn immediate() -> Self {
        Self {
            command_timeout: Duration::from_secs(5),
            strategy_pause: Duration::ZERO,
            settings_commit: Duration::ZERO,
            ready_poll_interval: Duration::ZERO,
            boot_settle: Duration::ZERO,
            ready_timeout_minutes: 1,
            validation_settle: Duration::ZERO,
            wake_settle: Duration::ZERO,
        }
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("DLOCK_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".dlock_config.json")
}

pub fn load_config_from_path(path: &Path, trace_id: &str) -> Result<AppConfig, AppError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| AppError::system(format!("Failed to read config: {err}"), trace_id))?;
    let config: AppConfig = serde_json::from_str(&raw)
        .map_err(|err| AppError::validation(format!("Failed to parse config: {err}"), trace_id))?;
    Ok(validate_config(config))
}

pub fn save_config_to_path(config: &AppConfig, path: &Path, trace_id: &str) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let payload = serde_json::to_string_pretty(config)
        .map_err(|err| AppError::system(format!("Failed to serialize config: {err}"), trace_id))?;
    fs::write(path, payload)
        .map_err(|err| AppError::system(format!("Failed to write config: {err}"), trace_id))?;
    Ok(())
}

fn validate_config(mut config: AppConfig) -> AppConfig {
    let defaults = TimingSettings::default();
    let timing = &mut config.timing;
    if timing.command_timeout_secs == 0 {
        timing.command_timeout_secs = defaults.command_timeout_secs;
    }
    timing.strategy_pause_ms = timing.strategy_pause_ms.max(MIN_STRATEGY_PAUSE_MS);
    if timing.ready_poll_interval_ms == 0 {
        timing.ready_poll_interval_ms = defaults.ready_poll_interval_ms;
    }
    if timing.ready_timeout_minutes == 0 {
        timing.ready_timeout_minutes = defaults.ready_timeout_minutes;
    }
    if config.logging.log_level.trim().is_empty() {
        config.logging.log_level = LoggingSettings::default().log_level;
    }
    config
}
