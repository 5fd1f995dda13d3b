use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::app::error::AppError;

pub const TIMED_OUT: &str = "Command timed out";

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr, trimmed.
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (_, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (false, false) => format!("{stdout}\n{stderr}"),
        }
    }
}

fn spawn_isolated(program: &str, args: &[String]) -> std::io::Result<Child> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    own_process_group(&mut command);
    command.spawn()
}

/// Puts the child in its own process group, so a timeout can take down
/// anything it forked.
#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

#[cfg(unix)]
fn kill_process_group(child: &Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: killpg only sends a signal; the group id is our own child's pid.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

/// Kills the child and its process group, then reaps the child.
///
/// The drain threads are left to finish on their own: a descendant that
/// escaped the group can still hold the pipes open.
fn terminate(child: &mut Child) {
    kill_process_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buffer = Vec::<u8>::new();
        let mut temp = [0u8; 4096];
        loop {
            match reader.read(&mut temp) {
                Ok(0) => break,
                Ok(count) => buffer.extend_from_slice(&temp[..count]),
                Err(_) => break,
            }
        }
        buffer
    })
}

/// Runs `program` with `args`, killing and reaping it once `timeout` elapses.
pub fn run_command_with_timeout(
    program: &str,
    args: &[String],
    timeout: Duration,
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    let mut child = spawn_isolated(program, args)
        .map_err(|err| AppError::dependency(format!("Failed to spawn {program}: {err}"), trace_id))?;

    // Both pipes are drained concurrently; a child that fills one pipe buffer
    // would otherwise stall and run into the timeout.
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stdout", trace_id))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stderr", trace_id))?;
    let stdout_handle = drain(stdout);
    let stderr_handle = drain(stderr);

    let start = Instant::now();
    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {
                if start.elapsed() > timeout {
                    terminate(&mut child);
                    return Err(AppError::timeout(TIMED_OUT, trace_id));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                terminate(&mut child);
                return Err(AppError::system(
                    format!("Failed to poll command: {err}"),
                    trace_id,
                ));
            }
        }
    };

    let stdout_bytes = stdout_handle.join().unwrap_or_default();
    let stderr_bytes = stderr_handle.join().unwrap_or_default();

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).to_string(),
        stderr: String::from_utf8_lossy(&stderr_bytes).to_string(),
        exit_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> (String, Vec<String>) {
        if cfg!(windows) {
            ("cmd.exe".to_string(), vec!["/C".to_string(), script.to_string()])
        } else {
            ("sh".to_string(), vec!["-c".to_string(), script.to_string()])
        }
    }

    #[test]
    fn run_command_with_timeout_does_not_deadlock_on_large_stdout() {
        let (program, args) = if cfg!(windows) {
            shell("for /L %i in (1,1,100000) do @echo 1234567890")
        } else {
            shell("i=0; while [ $i -lt 100000 ]; do echo 1234567890; i=$((i+1)); done")
        };

        let output = run_command_with_timeout(&program, &args, Duration::from_secs(10), "trace-large")
            .expect("expected large-output command to complete without timing out");

        assert!(output.success());
        assert!(
            output.stdout.len() >= 1_000_000,
            "expected stdout >= 1000000, got {}",
            output.stdout.len()
        );
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_the_child_and_reports_timed_out() {
        let (program, args) = shell("sleep 30");
        let started = Instant::now();
        let err = run_command_with_timeout(&program, &args, Duration::from_millis(200), "trace-slow")
            .expect_err("expected timeout");

        assert!(err.is_timeout());
        assert_eq!(err.error, TIMED_OUT);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_is_bounded_when_the_child_forks() {
        // The shell forks `sleep`, which inherits both pipes.
        let (program, args) = shell("sleep 6; echo done");
        let started = Instant::now();
        let err = run_command_with_timeout(&program, &args, Duration::from_millis(300), "trace-fork")
            .expect_err("expected timeout");

        assert!(err.is_timeout());
        assert!(
            started.elapsed() < Duration::from_secs(3),
            "timeout took {:?}",
            started.elapsed()
        );
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_background_descendants() {
        let dir = tempfile::TempDir::new().expect("tmp");
        let marker = dir.path().join("survived");
        let script = format!("(sleep 1; touch '{}') & wait", marker.display());
        let (program, args) = shell(&script);
        let err = run_command_with_timeout(&program, &args, Duration::from_millis(200), "trace-group")
            .expect_err("expected timeout");
        assert!(err.is_timeout());

        std::thread::sleep(Duration::from_millis(1_500));
        assert!(!marker.exists(), "descendant outlived the timeout");
    }

    #[cfg(unix)]
    #[test]
    fn captures_exit_code_and_both_streams() {
        let (program, args) = shell("echo out; echo err 1>&2; exit 3");
        let output = run_command_with_timeout(&program, &args, Duration::from_secs(5), "trace-exit")
            .expect("run");

        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert_eq!(output.combined(), "out\nerr");
    }

    #[test]
    fn missing_program_is_a_dependency_error() {
        let err = run_command_with_timeout(
            "dlock-program-that-does-not-exist",
            &[],
            Duration::from_secs(1),
            "trace-missing",
        )
        .expect_err("expected spawn failure");
        assert_eq!(err.code, "ERR_DEPENDENCY");
    }
}
