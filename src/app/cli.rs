use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::app::adb::bridge::AdbBridge;
use crate::app::adb::locator::{resolve_adb_program, validate_adb_program};
use crate::app::config::{config_path, load_config_from_path, save_config_to_path, Timing};
use crate::app::coordinator::LockScreenDisabler;
use crate::app::logging::init_logging;
use crate::app::models::{RunReport, RunSnapshot};

pub const USAGE: &str = "\
Android Lock Screen Disabler

Usage:
  dlock [options]

Options:
  --devices \"ID1 ID2\"   Space-separated device serials to process (default: all connected)
  --json                Print the run report as JSON when finished
  --config PATH         Read configuration from PATH instead of ~/.dlock_config.json
  --write-config        Write the effective configuration to the config path and exit
  -h, --help            Show this help

Examples:
  dlock
  dlock --devices \"ABC123DEF456 789GHI012JKL\"
  adb devices            # list serials of connected devices
";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    pub devices: Vec<String>,
    pub json: bool,
    pub config_path: Option<PathBuf>,
    pub write_config: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Run(Args),
}

pub fn parse_args<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        let (flag, inline_value) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with('-') => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        match flag.as_str() {
            "--devices" | "-devices" => {
                let value = inline_value
                    .or_else(|| it.next())
                    .ok_or_else(|| "--devices requires a value".to_string())?;
                parsed.devices.extend(value.split_whitespace().map(str::to_string));
            }
            "--config" => {
                let value = inline_value
                    .or_else(|| it.next())
                    .filter(|value| !value.trim().is_empty())
                    .ok_or_else(|| "--config requires a value".to_string())?;
                parsed.config_path = Some(PathBuf::from(value));
            }
            "--json" => parsed.json = true,
            "--write-config" => parsed.write_config = true,
            "-h" | "--help" | "-help" => return Ok(Command::Help),
            other => return Err(format!("Unknown arg: {other}")),
        }
    }
    Ok(Command::Run(parsed))
}

pub fn build_report(
    trace_id: &str,
    started_at: chrono::DateTime<Utc>,
    snapshot: RunSnapshot,
) -> RunReport {
    RunReport {
        trace_id: trace_id.to_string(),
        started_at: started_at.to_rfc3339(),
        finished_at: Utc::now().to_rfc3339(),
        total_targets: snapshot.total_targets,
        success_count: snapshot.success_count,
        failed_targets: snapshot.failed_targets,
        failures: snapshot.failures,
    }
}

fn log_summary(report: &RunReport) {
    let trace_id = report.trace_id.as_str();
    info!(
        trace_id = %trace_id,
        total = report.total_targets,
        succeeded = report.success_count,
        failed = report.failed_targets.len(),
        "execution summary"
    );
    if !report.failures.is_empty() {
        for failure in &report.failures {
            warn!(
                trace_id = %trace_id,
                serial = %failure.serial,
                reason = failure.reason.describe(),
                "device failed"
            );
        }
        warn!(trace_id = %trace_id, devices = %report.failed_targets.join(", "), "failed devices");
        info!("troubleshooting: ensure USB debugging is enabled");
        info!("troubleshooting: check whether the device is waiting for USB debugging authorization");
        info!("troubleshooting: try Settings > Developer options > Disable permission monitoring");
        info!("troubleshooting: some devices enforce policy restrictions on lock screen settings");
    }
    if report.success_count > 0 {
        info!(trace_id = %trace_id, "successfully processed {} device(s)", report.success_count);
    }
}

/// Full CLI flow. Returns the process exit code.
pub fn run<I>(args: I) -> i32
where
    I: IntoIterator<Item = String>,
{
    let args = match parse_args(args) {
        Ok(Command::Help) => {
            print!("{USAGE}");
            return 0;
        }
        Ok(Command::Run(args)) => args,
        Err(message) => {
            eprintln!("{message}\n\n{USAGE}");
            return 1;
        }
    };

    let trace_id = Uuid::new_v4().to_string();
    let path = args.config_path.clone().unwrap_or_else(config_path);
    let config = match load_config_from_path(&path, &trace_id) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}: {err}", path.display());
            return 1;
        }
    };

    if args.write_config {
        return match save_config_to_path(&config, &path, &trace_id) {
            Ok(()) => {
                println!("Wrote configuration to {}", path.display());
                0
            }
            Err(err) => {
                eprintln!("{err}");
                1
            }
        };
    }

    init_logging(&config.logging);
    info!(trace_id = %trace_id, "Android lock screen disabler starting");
    if !args.devices.is_empty() {
        info!(trace_id = %trace_id, devices = %args.devices.join(", "), "target devices specified");
    }

    let program = resolve_adb_program(&config.adb.command_path);
    if let Err(message) = validate_adb_program(&program) {
        error!(trace_id = %trace_id, program = %program, error = %message, "invalid adb path");
        return 1;
    }
    let timing = Timing::from(&config.timing);
    let bridge = Arc::new(AdbBridge::new(program, timing.command_timeout, trace_id.clone()));
    let disabler = LockScreenDisabler::new(bridge, &config, args.devices.clone(), trace_id.clone());

    let started_at = Utc::now();
    if let Err(err) = disabler.check_adb() {
        error!(trace_id = %trace_id, code = %err.code, error = %err.error, "adb check failed");
        info!("please install adb and make sure it is on your PATH");
        return 1;
    }
    let selection = match disabler.connected_targets() {
        Ok(selection) => selection,
        Err(err) => {
            error!(trace_id = %trace_id, code = %err.code, error = %err.error, "no devices to process");
            info!("please connect at least one Android device with USB debugging enabled");
            return 1;
        }
    };

    let snapshot = disabler.process_devices(&selection.targets);
    let report = build_report(&trace_id, started_at, snapshot);
    log_summary(&report);

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => warn!(trace_id = %trace_id, error = %err, "failed to serialize run report"),
        }
    }
    info!(trace_id = %trace_id, "completed");
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{FailureKind, TargetFailure};

    fn argv(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn no_args_processes_everything() {
        assert_eq!(parse_args(argv(&[])), Ok(Command::Run(Args::default())));
    }

    #[test]
    fn devices_flag_splits_on_whitespace() {
        let Command::Run(args) = parse_args(argv(&["--devices", " ABC  DEF\tGHI "])).expect("parse")
        else {
            panic!("expected run");
        };
        assert_eq!(args.devices, vec!["ABC", "DEF", "GHI"]);

        let Command::Run(args) = parse_args(argv(&["-devices=ABC DEF", "--json"])).expect("parse")
        else {
            panic!("expected run");
        };
        assert_eq!(args.devices, vec!["ABC", "DEF"]);
        assert!(args.json);
    }

    #[test]
    fn help_wins_and_unknown_args_fail() {
        assert_eq!(parse_args(argv(&["--json", "-h"])), Ok(Command::Help));
        assert!(parse_args(argv(&["--frobnicate"])).unwrap_err().contains("Unknown arg"));
        assert!(parse_args(argv(&["--devices"])).is_err());
        assert!(parse_args(argv(&["--config", " "])).is_err());
    }

    #[test]
    fn config_and_write_flags() {
        let Command::Run(args) =
            parse_args(argv(&["--config", "/tmp/dlock.json", "--write-config"])).expect("parse")
        else {
            panic!("expected run");
        };
        assert_eq!(args.config_path, Some(PathBuf::from("/tmp/dlock.json")));
        assert!(args.write_config);
    }

    #[test]
    fn report_carries_snapshot_counts() {
        let snapshot = RunSnapshot {
            success_count: 1,
            failed_targets: vec!["B".to_string()],
            total_targets: 2,
            failures: vec![TargetFailure {
                serial: "B".to_string(),
                reason: FailureKind::ReadinessTimeout,
            }],
        };
        let report = build_report("trace-cli", Utc::now(), snapshot);
        assert_eq!(report.total_targets, 2);
        assert_eq!(report.failed_targets, vec!["B"]);

        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["failures"][0]["reason"], "readiness_timeout");
        assert_eq!(json["trace_id"], "trace-cli");
    }

    #[test]
    fn help_and_bad_args_exit_codes() {
        assert_eq!(run(argv(&["--help"])), 0);
        assert_eq!(run(argv(&["--bogus"])), 1);
    }

    #[test]
    fn write_config_creates_the_file() {
        let dir = tempfile::TempDir::new().expect("tmp");
        let path = dir.path().join("dlock.json");
        let code = run(argv(&["--config", &path.to_string_lossy(), "--write-config"]));
        assert_eq!(code, 0);
        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"strategy_pause_ms\": 1000"));
    }

    #[test]
    fn missing_adb_exits_with_failure() {
        let dir = tempfile::TempDir::new().expect("tmp");
        let path = dir.path().join("dlock.json");
        std::fs::write(
            &path,
            serde_json::json!({ "adb": { "command_path": "dlock-adb-that-does-not-exist" } }).to_string(),
        )
        .expect("write");
        assert_eq!(run(argv(&["--config", &path.to_string_lossy()])), 1);
    }
}
