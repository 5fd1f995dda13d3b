use std::sync::Arc;
use std::thread;

use tracing::{info, warn};

use crate::app::adb::bridge::Bridge;
use crate::app::config::{AppConfig, Timing};
use crate::app::devices::{check_permissions, get_device_info};
use crate::app::lock::{has_lock, validate_lock_removal};
use crate::app::models::{DeviceOutcome, FailureKind, SuccessKind, ValidationOutcome};
use crate::app::reboot::{reboot, wait_ready};
use crate::app::state::RunStatistics;
use crate::app::strategies::attempt_disable;

/// Everything a device worker needs. Cheap to clone into each thread.
#[derive(Clone)]
pub struct DeviceContext {
    pub bridge: Arc<dyn Bridge>,
    pub timing: Timing,
    pub strict_validation: bool,
    pub trace_id: String,
}

impl DeviceContext {
    pub fn new(bridge: Arc<dyn Bridge>, config: &AppConfig, trace_id: impl Into<String>) -> Self {
        Self {
            bridge,
            timing: Timing::from(&config.timing),
            strict_validation: config.orchestration.strict_validation,
            trace_id: trace_id.into(),
        }
    }
}

/// Drives one device to a terminal outcome:
/// info → permissions → lock check → disable → reboot → ready → validate.
pub fn run_device(ctx: &DeviceContext, serial: &str) -> DeviceOutcome {
    let bridge = ctx.bridge.as_ref();
    let trace_id = ctx.trace_id.as_str();
    info!(trace_id = %trace_id, serial = %serial, "starting lock screen disable process");

    let device = get_device_info(bridge, serial);
    info!(
        trace_id = %trace_id,
        serial = %serial,
        manufacturer = %device.manufacturer,
        model = %device.model,
        android = %device.android_version,
        api = %device.api_level,
        "device info"
    );

    if !check_permissions(bridge, serial, trace_id) {
        warn!(
            trace_id = %trace_id,
            serial = %serial,
            "insufficient permissions; make sure USB debugging is enabled and the device is authorized"
        );
        return DeviceOutcome::Failed(FailureKind::PermissionDenied);
    }

    let lock = has_lock(bridge, serial, trace_id);
    if !lock.present {
        info!(trace_id = %trace_id, serial = %serial, "no lock screen configured, nothing to do");
        return DeviceOutcome::Success(SuccessKind::NoLockPresent);
    }
    info!(trace_id = %trace_id, serial = %serial, lock = %lock.description, "lock screen detected");

    if attempt_disable(bridge, serial, &ctx.timing, trace_id).is_none() {
        return DeviceOutcome::Failed(FailureKind::RemediationExhausted);
    }

    thread::sleep(ctx.timing.settings_commit);
    if !reboot(bridge, serial, trace_id) {
        warn!(
            trace_id = %trace_id,
            serial = %serial,
            "reboot failed, but lock screen settings were applied"
        );
        return DeviceOutcome::Success(SuccessKind::RebootSkipped);
    }

    if !wait_ready(bridge, serial, ctx.timing.ready_timeout_minutes, &ctx.timing, trace_id) {
        return DeviceOutcome::Failed(FailureKind::ReadinessTimeout);
    }

    match validate_lock_removal(bridge, serial, &ctx.timing, trace_id) {
        ValidationOutcome::Removed => {
            info!(trace_id = %trace_id, serial = %serial, "lock screen disabled and validated");
            DeviceOutcome::Success(SuccessKind::Validated)
        }
        ValidationOutcome::StillLocked | ValidationOutcome::Inconclusive
            if ctx.strict_validation =>
        {
            DeviceOutcome::Failed(FailureKind::ValidationFailed)
        }
        outcome => {
            warn!(
                trace_id = %trace_id,
                serial = %serial,
                validation = ?outcome,
                "settings were applied, but validation after reboot did not confirm removal"
            );
            if outcome == ValidationOutcome::StillLocked {
                DeviceOutcome::Success(SuccessKind::StillLocked)
            } else {
                DeviceOutcome::Success(SuccessKind::ValidationInconclusive)
            }
        }
    }
}

/// [`run_device`] plus exactly one update of the shared statistics.
pub fn process_device(ctx: &DeviceContext, serial: &str, stats: &RunStatistics) -> DeviceOutcome {
    let outcome = run_device(ctx, serial);
    stats.record(serial, outcome);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::adb::scripted::{fail, ok, ScriptedBridge};

    const SERIAL: &str = "D1";

    fn context(bridge: &Arc<ScriptedBridge>, strict_validation: bool) -> DeviceContext {
        DeviceContext {
            bridge: bridge.clone(),
            timing: Timing::immediate(),
            strict_validation,
            trace_id: "trace-orch".to_string(),
        }
    }

    /// Authorized device whose `locksettings get-disabled` reports a lock.
    fn locked_device() -> ScriptedBridge {
        ScriptedBridge::new()
            .on("shell getprop", ok("[ro.product.model]: [Pixel 7]"))
            .on("shell echo test", ok("test"))
            .on("shell settings list secure", ok("adb_enabled=1"))
            .on("shell locksettings get-disabled", ok("false"))
    }

    fn remediation_touched(bridge: &ScriptedBridge) -> bool {
        bridge
            .calls()
            .iter()
            .any(|call| call.command.contains("locksettings clear") || call.command.contains(" put "))
    }

    #[test]
    fn no_lock_succeeds_without_remediation() {
        let bridge = Arc::new(
            ScriptedBridge::new()
                .on("shell echo test", ok("test"))
                .on("shell settings list secure", ok("adb_enabled=1"))
                .on("shell locksettings get-disabled", ok("true")),
        );
        let stats = RunStatistics::new(1);
        let outcome = process_device(&context(&bridge, false), SERIAL, &stats);

        assert_eq!(outcome, DeviceOutcome::Success(SuccessKind::NoLockPresent));
        assert!(!remediation_touched(&bridge));
        assert!(!bridge.called("reboot"));
        assert_eq!(stats.snapshot().success_count, 1);
    }

    #[test]
    fn missing_permissions_fail_before_inspection() {
        let bridge = Arc::new(ScriptedBridge::new().on("shell echo test", fail("unauthorized")));
        let stats = RunStatistics::new(1);
        let outcome = process_device(&context(&bridge, false), SERIAL, &stats);

        assert_eq!(outcome, DeviceOutcome::Failed(FailureKind::PermissionDenied));
        assert!(!bridge.called("shell dumpsys trust"));
        assert_eq!(stats.snapshot().failed_targets, vec![SERIAL]);
    }

    #[test]
    fn exhausted_cascade_marks_device_failed() {
        let bridge = Arc::new(locked_device());
        let stats = RunStatistics::new(1);
        let outcome = process_device(&context(&bridge, false), SERIAL, &stats);

        assert_eq!(outcome, DeviceOutcome::Failed(FailureKind::RemediationExhausted));
        assert!(!bridge.called("reboot"));
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.success_count, 0);
        assert_eq!(snapshot.failed_targets, vec![SERIAL]);
    }

    #[test]
    fn rejected_reboot_still_counts_as_success() {
        let bridge = Arc::new(
            locked_device()
                .on("shell settings put secure lockscreen.disabled 1", ok(""))
                .on("reboot", fail("device offline")),
        );
        let outcome = run_device(&context(&bridge, false), SERIAL);
        assert_eq!(outcome, DeviceOutcome::Success(SuccessKind::RebootSkipped));
        assert!(!bridge.called("get-state"));
    }

    #[test]
    fn device_not_returning_after_reboot_fails() {
        let bridge = Arc::new(
            locked_device()
                .on("shell locksettings set-disabled true", ok(""))
                .on("reboot", ok(""))
                .on("get-state", fail("device not found")),
        );
        let outcome = run_device(&context(&bridge, false), SERIAL);
        assert_eq!(outcome, DeviceOutcome::Failed(FailureKind::ReadinessTimeout));
        assert_eq!(bridge.count("get-state"), 12);
    }

    fn rebooted_device() -> ScriptedBridge {
        locked_device()
            .on("shell locksettings set-disabled true", ok(""))
            .on("reboot", ok(""))
            .on("get-state", ok("device"))
    }

    #[test]
    fn validated_removal_is_success() {
        let bridge = Arc::new(rebooted_device().on(
            "shell dumpsys activity activities",
            ok("mResumedActivity: ActivityRecord{7 u0 com.android.launcher3/.Launcher}"),
        ));
        let outcome = run_device(&context(&bridge, false), SERIAL);
        assert_eq!(outcome, DeviceOutcome::Success(SuccessKind::Validated));
    }

    #[test]
    fn inconclusive_validation_fails_open_by_default() {
        let bridge = Arc::new(rebooted_device());
        let outcome = run_device(&context(&bridge, false), SERIAL);
        assert_eq!(outcome, DeviceOutcome::Success(SuccessKind::ValidationInconclusive));
        assert_eq!(bridge.count("shell input keyevent KEYCODE_WAKEUP"), 1);
    }

    #[test]
    fn still_locked_fails_open_by_default_and_closed_when_strict() {
        let bridge = Arc::new(rebooted_device().on("shell dumpsys power", ok("mWakefulness=Asleep")));
        assert_eq!(
            run_device(&context(&bridge, false), SERIAL),
            DeviceOutcome::Success(SuccessKind::StillLocked)
        );
        assert_eq!(
            run_device(&context(&bridge, true), SERIAL),
            DeviceOutcome::Failed(FailureKind::ValidationFailed)
        );
    }
}
