use std::collections::HashMap;

use crate::app::models::{DeviceInfo, DeviceSummary};

/// Parses `adb devices`. The header and daemon status lines are skipped.
pub fn parse_adb_devices(output: &str) -> Vec<DeviceSummary> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.trim_start().starts_with('*'))
        .filter(|line| !line.to_lowercase().contains("list of devices"))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let serial = tokens.next()?.to_string();
            let state = tokens.next()?.to_string();
            Some(DeviceSummary { serial, state })
        })
        .collect()
}

/// Serials in listing order whose state is `device` (online and authorized).
pub fn online_serials(output: &str) -> Vec<String> {
    parse_adb_devices(output)
        .into_iter()
        .filter(DeviceSummary::is_online)
        .map(|summary| summary.serial)
        .collect()
}

pub fn parse_getprop_map(output: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in output.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with('[') {
            continue;
        }
        let Some((key_part, value_part)) = trimmed.split_once("]: [") else {
            continue;
        };
        let key = key_part.trim_start_matches('[').trim();
        let value = value_part.trim_end_matches(']').trim();
        if !key.is_empty() {
            map.insert(key.to_string(), value.to_string());
        }
    }
    map
}

pub fn build_device_info(getprop_map: &HashMap<String, String>) -> DeviceInfo {
    let pick = |key: &str, fallback: String| {
        getprop_map
            .get(key)
            .filter(|value| !value.is_empty())
            .cloned()
            .unwrap_or(fallback)
    };
    let defaults = DeviceInfo::default();
    DeviceInfo {
        model: pick("ro.product.model", defaults.model),
        manufacturer: pick("ro.product.manufacturer", defaults.manufacturer),
        android_version: pick("ro.build.version.release", defaults.android_version),
        api_level: pick("ro.build.version.sdk", defaults.api_level),
    }
}
