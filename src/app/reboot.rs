use std::thread;

use tracing::{info, warn};

use crate::app::adb::bridge::Bridge;
use crate::app::config::Timing;

pub const POLLS_PER_MINUTE: u32 = 12;
const PROGRESS_EVERY: u32 = 6;

/// Sends `adb reboot`. `true` only means adb accepted the command.
pub fn reboot(bridge: &dyn Bridge, serial: &str, trace_id: &str) -> bool {
    info!(trace_id = %trace_id, serial = %serial, "rebooting device");
    let result = bridge.execute("reboot", Some(serial));
    if result.succeeded {
        info!(trace_id = %trace_id, serial = %serial, "reboot command sent");
        true
    } else {
        warn!(trace_id = %trace_id, serial = %serial, error = %result.error, "failed to reboot device");
        false
    }
}

/// Polls until the device is addressable and its shell answers, giving up
/// after `max_minutes * 12` attempts. Running out of attempts is a plain
/// `false`, not an error.
pub fn wait_ready(
    bridge: &dyn Bridge,
    serial: &str,
    max_minutes: u32,
    timing: &Timing,
    trace_id: &str,
) -> bool {
    info!(trace_id = %trace_id, serial = %serial, max_minutes, "waiting for device after reboot");
    let max_attempts = max_minutes.saturating_mul(POLLS_PER_MINUTE);

    for attempt in 1..=max_attempts {
        if bridge.execute("get-state", Some(serial)).succeeded {
            info!(trace_id = %trace_id, serial = %serial, "device detected, waiting for system to boot");
            thread::sleep(timing.boot_settle);
            if bridge.shell("echo test", serial).succeeded {
                info!(trace_id = %trace_id, serial = %serial, attempt, "device is ready");
                return true;
            }
        }

        if attempt % PROGRESS_EVERY == 0 {
            info!(
                trace_id = %trace_id,
                serial = %serial,
                minutes_waited = attempt / POLLS_PER_MINUTE,
                max_minutes,
                "still waiting for device"
            );
        }
        thread::sleep(timing.ready_poll_interval);
    }

    warn!(trace_id = %trace_id, serial = %serial, max_minutes, "timed out waiting for device");
    false
}
