use std::sync::Arc;
use std::thread;

use tracing::{info, warn};

use crate::app::adb::bridge::Bridge;
use crate::app::adb::locator::resolve_adb_program;
use crate::app::config::AppConfig;
use crate::app::devices::{check_adb, get_device_info, list_targets};
use crate::app::error::AppError;
use crate::app::lock::has_lock;
use crate::app::models::{
    AdbInfo, DeviceInfo, DeviceOutcome, FailureKind, LockPresence, RunSnapshot, TargetSelection,
};
use crate::app::orchestrator::{process_device, DeviceContext};
use crate::app::state::RunStatistics;

/// Runs every target on its own thread and waits for all of them.
///
/// Workers share nothing but the statistics; the returned snapshot is taken
/// after the last worker has finished.
pub fn process_all(ctx: &DeviceContext, targets: &[String]) -> RunSnapshot {
    let stats = Arc::new(RunStatistics::new(targets.len()));
    if targets.is_empty() {
        return stats.snapshot();
    }
    info!(trace_id = %ctx.trace_id, count = targets.len(), "processing devices concurrently");

    let mut handles = Vec::with_capacity(targets.len());
    for serial in targets {
        let ctx_clone = ctx.clone();
        let stats_clone = Arc::clone(&stats);
        let serial_clone = serial.clone();
        let spawned = thread::Builder::new()
            .name(format!("dlock-{serial}"))
            .spawn(move || process_device(&ctx_clone, &serial_clone, &stats_clone));
        match spawned {
            Ok(handle) => handles.push((serial, handle)),
            Err(err) => {
                warn!(trace_id = %ctx.trace_id, serial = %serial, error = %err, "failed to start device worker");
                stats.record(serial, DeviceOutcome::Failed(FailureKind::Aborted));
            }
        }
    }

    info!(trace_id = %ctx.trace_id, "waiting for all devices to complete processing");
    for (serial, handle) in handles {
        if handle.join().is_err() {
            warn!(trace_id = %ctx.trace_id, serial = %serial, "device worker panicked");
            stats.record(serial, DeviceOutcome::Failed(FailureKind::Aborted));
        }
    }

    stats.snapshot()
}

/// Library entry point bundling the bridge, configuration and target filter.
pub struct LockScreenDisabler {
    ctx: DeviceContext,
    target_filter: Vec<String>,
    command_path: String,
}

impl LockScreenDisabler {
    pub fn new(
        bridge: Arc<dyn Bridge>,
        config: &AppConfig,
        target_filter: Vec<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            ctx: DeviceContext::new(bridge, config, trace_id),
            target_filter,
            command_path: resolve_adb_program(&config.adb.command_path),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.ctx.trace_id
    }

    pub fn check_adb(&self) -> Result<AdbInfo, AppError> {
        check_adb(self.ctx.bridge.as_ref(), &self.command_path, &self.ctx.trace_id)
    }

    /// Online devices after applying the target filter. Zero devices is an error.
    pub fn connected_targets(&self) -> Result<TargetSelection, AppError> {
        let selection = list_targets(self.ctx.bridge.as_ref(), &self.target_filter, &self.ctx.trace_id)?;
        if selection.targets.is_empty() {
            let message = if self.target_filter.is_empty() {
                "No connected devices found"
            } else {
                "None of the specified devices are connected"
            };
            warn!(trace_id = %self.ctx.trace_id, "{message}");
            return Err(AppError::no_devices(message, &self.ctx.trace_id));
        }
        info!(
            trace_id = %self.ctx.trace_id,
            count = selection.targets.len(),
            connected = selection.online_count,
            devices = %selection.targets.join(", "),
            "found devices to process"
        );
        Ok(selection)
    }

    pub fn device_info(&self, serial: &str) -> DeviceInfo {
        get_device_info(self.ctx.bridge.as_ref(), serial)
    }

    pub fn has_lock(&self, serial: &str) -> LockPresence {
        has_lock(self.ctx.bridge.as_ref(), serial, &self.ctx.trace_id)
    }

    pub fn process_devices(&self, targets: &[String]) -> RunSnapshot {
        process_all(&self.ctx, targets)
    }

    pub fn process_single_device(&self, serial: &str) -> bool {
        self.process_devices(&[serial.to_string()]).success_count > 0
    }
}
