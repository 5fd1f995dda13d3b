use std::time::Duration;

use tracing::{debug, warn};

use crate::app::adb::runner::run_command_with_timeout;
use crate::app::models::ExecutionResult;

/// Executes adb commands against one device, or against whichever single
/// device is attached when `serial` is `None`.
///
/// `command` is the adb argument string, e.g. `shell settings get secure lockscreen.disabled`.
pub trait Bridge: Send + Sync {
    fn execute(&self, command: &str, serial: Option<&str>) -> ExecutionResult;

    fn shell(&self, command: &str, serial: &str) -> ExecutionResult {
        self.execute(&format!("shell {command}"), Some(serial))
    }
}

pub fn build_adb_args(command: &str, serial: Option<&str>) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(serial) = serial.filter(|value| !value.trim().is_empty()) {
        args.push("-s".to_string());
        args.push(serial.to_string());
    }
    args.extend(command.split_whitespace().map(str::to_string));
    args
}

/// Spawns the real adb program for every call.
#[derive(Debug, Clone)]
pub struct AdbBridge {
    program: String,
    timeout: Duration,
    trace_id: String,
}

impl AdbBridge {
    pub fn new(program: impl Into<String>, timeout: Duration, trace_id: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout,
            trace_id: trace_id.into(),
        }
    }
}

impl Bridge for AdbBridge {
    fn execute(&self, command: &str, serial: Option<&str>) -> ExecutionResult {
        let args = build_adb_args(command, serial);
        match run_command_with_timeout(&self.program, &args, self.timeout, &self.trace_id) {
            Ok(output) if output.success() => ExecutionResult::success(output.combined()),
            Ok(output) => {
                let stderr = output.stderr.trim();
                let error = if stderr.is_empty() {
                    match output.exit_code {
                        Some(code) => format!("exit status {code}"),
                        None => "terminated by signal".to_string(),
                    }
                } else {
                    stderr.to_string()
                };
                debug!(
                    trace_id = %self.trace_id,
                    command = %command,
                    serial = serial.unwrap_or("-"),
                    exit_code = ?output.exit_code,
                    "adb command failed"
                );
                ExecutionResult {
                    succeeded: false,
                    output: output.combined(),
                    error,
                }
            }
            Err(err) if err.is_timeout() => {
                warn!(
                    trace_id = %self.trace_id,
                    command = %command,
                    serial = serial.unwrap_or("-"),
                    timeout_secs = self.timeout.as_secs(),
                    "adb command timed out"
                );
                ExecutionResult::failure(err.error)
            }
            Err(err) => {
                debug!(
                    trace_id = %self.trace_id,
                    command = %command,
                    serial = serial.unwrap_or("-"),
                    code = %err.code,
                    error = %err.error,
                    "adb command did not complete"
                );
                ExecutionResult::failure(err.error)
            }
        }
    }
}
