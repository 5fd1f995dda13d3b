use std::sync::OnceLock;
use std::thread;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::app::adb::bridge::Bridge;
use crate::app::config::Timing;
use crate::app::models::{LockPresence, LockScreenState, ValidationOutcome};

static TRUST_SECURE: OnceLock<Option<Regex>> = OnceLock::new();
static KEYGUARD_SECURE: OnceLock<Option<Regex>> = OnceLock::new();
static PASSWORD_POLICY: OnceLock<Option<Regex>> = OnceLock::new();

fn is_match(cell: &'static OnceLock<Option<Regex>>, pattern: &str, text: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(text))
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// A settings value that carries information (not blank, not `null`).
fn settings_value(bridge: &dyn Bridge, serial: &str, command: &str) -> Option<String> {
    let result = bridge.shell(command, serial);
    if !result.succeeded {
        return None;
    }
    let value = result.output.trim();
    if value.is_empty() || value == "null" {
        return None;
    }
    Some(value.to_string())
}

/// Whether a lock screen is configured. Checks run in a fixed order and the
/// first definitive one wins:
///
/// 1. trust manager dump
/// 2. `locksettings get-disabled`
/// 3. KeyguardService dump
/// 4. secure settings values
/// 5. device policy dump
///
/// A `true` from `locksettings get-disabled` suppresses the later
/// `lockscreen.disabled == 0` check, since both read the same setting.
pub fn has_lock(bridge: &dyn Bridge, serial: &str, trace_id: &str) -> LockPresence {
    info!(trace_id = %trace_id, serial = %serial, "checking for a configured lock screen");

    let trust = bridge.shell("dumpsys trust", serial);
    if trust.has_output()
        && is_match(&TRUST_SECURE, r"(?i)is(device|keyguard)secure=true", &trust.output)
    {
        return LockPresence::present("Device has secure lock screen (detected via trust manager)");
    }

    let mut disabled_via_locksettings = false;
    let locksettings = bridge.shell("locksettings get-disabled", serial);
    if locksettings.succeeded {
        disabled_via_locksettings = locksettings.output.to_lowercase().contains("true");
        if !disabled_via_locksettings {
            return LockPresence::present("Device has lock configured (detected via locksettings)");
        }
    }

    let keyguard = bridge.shell("dumpsys activity services KeyguardService", serial);
    if keyguard.has_output()
        && is_match(&KEYGUARD_SECURE, r"(?i)(secure|enabled)=true", &keyguard.output)
    {
        return LockPresence::present("Device has keyguard enabled (detected via KeyguardService)");
    }

    if settings_value(bridge, serial, "settings get secure lock_pattern_enabled").as_deref()
        == Some("1")
    {
        return LockPresence::present("Device has lock pattern enabled");
    }
    if let Some(kind) = settings_value(bridge, serial, "settings get secure lockscreen.password_type")
    {
        if kind != "0" {
            return LockPresence::present(format!(
                "Device has password type configured (type: {kind})"
            ));
        }
    }
    if settings_value(bridge, serial, "settings get secure lockscreen.disabled").as_deref()
        == Some("0")
        && !disabled_via_locksettings
    {
        return LockPresence::present("Lock screen is explicitly enabled in settings");
    }

    let policy = bridge.shell("dumpsys device_policy", serial);
    if policy.has_output()
        && is_match(
            &PASSWORD_POLICY,
            r"(?i)passwordquality|minimumpasswordlength",
            &policy.output,
        )
    {
        return LockPresence::present("Device has admin-enforced password policy");
    }

    LockPresence::absent()
}

fn lines_lowercase(output: &str) -> impl Iterator<Item = String> + '_ {
    output.lines().map(str::to_lowercase)
}

/// Whether a lock screen is on display right now. Checks run in a fixed
/// order (window manager, power manager, foreground activity, settings) and
/// the first definitive one wins. With no definitive signal the result is
/// [`LockScreenState::Indeterminate`], which callers treat as locked.
pub fn is_locked(bridge: &dyn Bridge, serial: &str, trace_id: &str) -> LockScreenState {
    debug!(trace_id = %trace_id, serial = %serial, "checking lock screen status");

    let window = bridge.shell("dumpsys window", serial);
    if window.has_output() {
        let showing = lines_lowercase(&window.output).any(|line| {
            contains_any(
                &line,
                &["mdreaminglockscreen", "mshowinglockscreen", "keyguardcontroller"],
            ) && contains_any(
                &line,
                &[
                    "mshowinglockscreen=true",
                    "mdreaminglockscreen=true",
                    "keyguardshowing=true",
                ],
            )
        });
        if showing {
            return LockScreenState::Locked;
        }
    }

    let power = bridge.shell("dumpsys power", serial);
    if power.has_output() {
        let asleep = lines_lowercase(&power.output).any(|line| {
            contains_any(&line, &["mwakefulness", "display power"])
                && contains_any(&line, &["asleep", "dozing"])
        });
        if asleep {
            return LockScreenState::Locked;
        }
    }

    let activities = bridge.shell("dumpsys activity activities", serial);
    if activities.has_output() {
        let foreground_app = lines_lowercase(&activities.output).any(|line| {
            contains_any(&line, &["mresumedactivity", "mfocusedactivity"])
                && !contains_any(&line, &["keyguard", "lockscreen", "bouncer"])
        });
        if foreground_app {
            return LockScreenState::Unlocked;
        }
    }

    let disabled = bridge.shell("settings get secure lockscreen.disabled", serial);
    if disabled.succeeded && disabled.output.trim() == "1" {
        return LockScreenState::Unlocked;
    }

    let locksettings = bridge.shell("locksettings get-disabled", serial);
    if locksettings.succeeded && locksettings.output.to_lowercase().contains("true") {
        return LockScreenState::Unlocked;
    }

    LockScreenState::Indeterminate
}

/// Post-reboot check: settle, read the lock state, and on an indeterminate
/// reading wake the screen and read once more.
pub fn validate_lock_removal(
    bridge: &dyn Bridge,
    serial: &str,
    timing: &Timing,
    trace_id: &str,
) -> ValidationOutcome {
    info!(trace_id = %trace_id, serial = %serial, "validating lock screen removal");
    thread::sleep(timing.validation_settle);

    let mut state = is_locked(bridge, serial, trace_id);
    if state.is_indeterminate() {
        warn!(
            trace_id = %trace_id,
            serial = %serial,
            "could not determine lock screen status, waking device and retrying"
        );
        let wake = bridge.shell("input keyevent KEYCODE_WAKEUP", serial);
        if !wake.succeeded {
            debug!(trace_id = %trace_id, serial = %serial, error = %wake.error, "wake key event failed");
        }
        thread::sleep(timing.wake_settle);
        state = is_locked(bridge, serial, trace_id);
    }

    match state {
        LockScreenState::Unlocked => {
            info!(trace_id = %trace_id, serial = %serial, "lock screen successfully removed");
            ValidationOutcome::Removed
        }
        LockScreenState::Locked => {
            warn!(trace_id = %trace_id, serial = %serial, "lock screen is still present");
            ValidationOutcome::StillLocked
        }
        LockScreenState::Indeterminate => {
            warn!(trace_id = %trace_id, serial = %serial, "lock screen status is still indeterminate");
            ValidationOutcome::Inconclusive
        }
    }
}
