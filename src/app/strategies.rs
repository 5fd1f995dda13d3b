use std::thread;

use tracing::{info, warn};

use crate::app::adb::bridge::Bridge;
use crate::app::config::Timing;
use crate::app::models::ExecutionResult;

/// Ways of disabling the lock screen, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    LockSettings,
    SecureSetting,
    SystemSetting,
    Provisioning,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::LockSettings,
        Strategy::SecureSetting,
        Strategy::SystemSetting,
        Strategy::Provisioning,
    ];

    pub fn number(self) -> usize {
        match self {
            Strategy::LockSettings => 1,
            Strategy::SecureSetting => 2,
            Strategy::SystemSetting => 3,
            Strategy::Provisioning => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Strategy::LockSettings => "locksettings",
            Strategy::SecureSetting => "settings secure",
            Strategy::SystemSetting => "settings system",
            Strategy::Provisioning => "settings global",
        }
    }

    /// Runs this strategy once. `Err` carries the diagnostic to log.
    pub fn apply(self, bridge: &dyn Bridge, serial: &str, trace_id: &str) -> Result<(), String> {
        match self {
            Strategy::LockSettings => {
                if bridge.shell("locksettings clear", serial).succeeded {
                    info!(trace_id = %trace_id, serial = %serial, "cleared existing lock settings");
                }
                expect_success(bridge.shell("locksettings set-disabled true", serial))
            }
            Strategy::SecureSetting => {
                expect_success(bridge.shell("settings put secure lockscreen.disabled 1", serial))
            }
            Strategy::SystemSetting => {
                expect_success(bridge.shell("settings put system lockscreen_disabled 1", serial))
            }
            Strategy::Provisioning => {
                let results = [
                    bridge.shell("settings put global device_provisioned 1", serial),
                    bridge.shell("settings put secure user_setup_complete 1", serial),
                ];
                // One of the two flags is enough.
                if results.iter().any(|result| result.succeeded) {
                    Ok(())
                } else {
                    Err(results
                        .iter()
                        .map(|result| result.error.as_str())
                        .filter(|error| !error.is_empty())
                        .collect::<Vec<_>>()
                        .join("; "))
                }
            }
        }
    }
}

fn expect_success(result: ExecutionResult) -> Result<(), String> {
    if result.succeeded {
        Ok(())
    } else {
        Err(result.error)
    }
}

/// Tries every [`Strategy`] in order until one succeeds, pausing between
/// failed attempts. Returns the strategy that worked.
pub fn attempt_disable(
    bridge: &dyn Bridge,
    serial: &str,
    timing: &Timing,
    trace_id: &str,
) -> Option<Strategy> {
    for (index, strategy) in Strategy::ALL.iter().copied().enumerate() {
        if index > 0 {
            thread::sleep(timing.strategy_pause);
        }
        info!(
            trace_id = %trace_id,
            serial = %serial,
            strategy = strategy.number(),
            method = strategy.label(),
            "trying lock screen disable method"
        );
        match strategy.apply(bridge, serial, trace_id) {
            Ok(()) => {
                info!(
                    trace_id = %trace_id,
                    serial = %serial,
                    strategy = strategy.number(),
                    "lock screen disable method succeeded"
                );
                return Some(strategy);
            }
            Err(error) => {
                warn!(
                    trace_id = %trace_id,
                    serial = %serial,
                    strategy = strategy.number(),
                    error = %error,
                    "lock screen disable method failed"
                );
            }
        }
    }
    warn!(trace_id = %trace_id, serial = %serial, "all lock screen disable methods failed");
    None
}
