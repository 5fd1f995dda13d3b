use std::collections::HashSet;

use tracing::{info, warn};

use crate::app::adb::bridge::Bridge;
use crate::app::adb::parse::{build_device_info, online_serials, parse_getprop_map};
use crate::app::error::AppError;
use crate::app::models::{AdbInfo, DeviceInfo, TargetSelection};

pub fn check_adb(bridge: &dyn Bridge, command_path: &str, trace_id: &str) -> Result<AdbInfo, AppError> {
    info!(trace_id = %trace_id, command_path = %command_path, "checking adb availability");
    let result = bridge.execute("version", None);
    if !result.succeeded {
        let message = if result.error.is_empty() {
            "ADB command returned a non-zero exit code".to_string()
        } else {
            result.error
        };
        warn!(trace_id = %trace_id, error = %message, "adb is not available");
        return Err(AppError::dependency(
            format!("ADB is not available: {message}"),
            trace_id,
        ));
    }
    info!(trace_id = %trace_id, "adb is available");
    Ok(AdbInfo {
        available: true,
        version_output: result.output,
        command_path: command_path.to_string(),
    })
}

/// Online devices, narrowed to `filter` when it is non-empty.
///
/// With a filter the result keeps the filter's order and drops duplicates;
/// every filter entry that is not online is reported in `missing` and logged.
pub fn list_targets(
    bridge: &dyn Bridge,
    filter: &[String],
    trace_id: &str,
) -> Result<TargetSelection, AppError> {
    info!(trace_id = %trace_id, "scanning for connected devices");
    let result = bridge.execute("devices", None);
    if !result.succeeded {
        return Err(AppError::dependency(
            format!("adb devices failed: {}", result.error),
            trace_id,
        ));
    }
    let online = online_serials(&result.output);
    let online_count = online.len();

    let filter: Vec<&str> = filter
        .iter()
        .map(|serial| serial.trim())
        .filter(|serial| !serial.is_empty())
        .collect();
    if filter.is_empty() {
        return Ok(TargetSelection {
            targets: online,
            missing: Vec::new(),
            online_count,
        });
    }

    info!(trace_id = %trace_id, filter = %filter.join(", "), "filtering devices by requested serials");
    let online_set: HashSet<&str> = online.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut selection = TargetSelection {
        online_count,
        ..TargetSelection::default()
    };
    for serial in filter {
        if !seen.insert(serial) {
            continue;
        }
        if online_set.contains(serial) {
            selection.targets.push(serial.to_string());
        } else {
            warn!(trace_id = %trace_id, serial = %serial, "device not found among connected devices");
            selection.missing.push(serial.to_string());
        }
    }
    Ok(selection)
}

/// Best-effort device description; anything unreadable stays "Unknown".
pub fn get_device_info(bridge: &dyn Bridge, serial: &str) -> DeviceInfo {
    let result = bridge.shell("getprop", serial);
    if !result.succeeded {
        return DeviceInfo::default();
    }
    build_device_info(&parse_getprop_map(&result.output))
}

/// Shell access plus read access to the secure settings table.
pub fn check_permissions(bridge: &dyn Bridge, serial: &str, trace_id: &str) -> bool {
    if !bridge.shell("echo test", serial).succeeded {
        warn!(trace_id = %trace_id, serial = %serial, "no shell access");
        return false;
    }
    if !bridge.shell("settings list secure", serial).has_output() {
        warn!(trace_id = %trace_id, serial = %serial, "cannot access settings");
        return false;
    }
    info!(trace_id = %trace_id, serial = %serial, "device has the necessary permissions");
    true
}
