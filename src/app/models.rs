use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";

/// Outcome of one adb invocation. Built once per call and never cached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionResult {
    pub succeeded: bool,
    pub output: String,
    pub error: String,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            output: output.into(),
            error: String::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: String::new(),
            error: error.into(),
        }
    }

    /// Succeeded with something other than blank output.
    pub fn has_output(&self) -> bool {
        self.succeeded && !self.output.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSummary {
    pub serial: String,
    pub state: String,
}

impl DeviceSummary {
    pub fn is_online(&self) -> bool {
        self.state == "device"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    pub model: String,
    pub manufacturer: String,
    pub android_version: String,
    pub api_level: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            model: UNKNOWN.to_string(),
            manufacturer: UNKNOWN.to_string(),
            android_version: UNKNOWN.to_string(),
            api_level: UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdbInfo {
    pub available: bool,
    pub version_output: String,
    pub command_path: String,
}

/// Result of the device directory lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSelection {
    pub targets: Vec<String>,
    /// Filter entries that are not currently online.
    pub missing: Vec<String>,
    pub online_count: usize,
}

/// Whether a lock screen is configured, and which check said so.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockPresence {
    pub present: bool,
    pub description: String,
}

impl LockPresence {
    pub fn present(description: impl Into<String>) -> Self {
        Self {
            present: true,
            description: description.into(),
        }
    }

    pub fn absent() -> Self {
        Self {
            present: false,
            description: "No lock screen detected".to_string(),
        }
    }
}

/// Whether a lock screen is being displayed right now.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LockScreenState {
    Locked,
    Unlocked,
    Indeterminate,
}

impl LockScreenState {
    pub fn is_indeterminate(self) -> bool {
        matches!(self, LockScreenState::Indeterminate)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ValidationOutcome {
    Removed,
    StillLocked,
    Inconclusive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuccessKind {
    NoLockPresent,
    /// Settings applied but the reboot command was rejected.
    RebootSkipped,
    Validated,
    ValidationInconclusive,
    StillLocked,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PermissionDenied,
    RemediationExhausted,
    ReadinessTimeout,
    ValidationFailed,
    Aborted,
}

impl FailureKind {
    pub fn describe(self) -> &'static str {
        match self {
            FailureKind::PermissionDenied => "insufficient permissions (shell or settings access)",
            FailureKind::RemediationExhausted => "all lock screen disable methods failed",
            FailureKind::ReadinessTimeout => "device did not come back after reboot",
            FailureKind::ValidationFailed => "lock screen still present after reboot",
            FailureKind::Aborted => "processing aborted unexpectedly",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", content = "kind", rename_all = "snake_case")]
pub enum DeviceOutcome {
    Success(SuccessKind),
    Failed(FailureKind),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetFailure {
    pub serial: String,
    pub reason: FailureKind,
}

/// Point-in-time copy of the run statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSnapshot {
    pub success_count: usize,
    pub failed_targets: Vec<String>,
    pub total_targets: usize,
    pub failures: Vec<TargetFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunReport {
    pub trace_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub total_targets: usize,
    pub success_count: usize,
    pub failed_targets: Vec<String>,
    pub failures: Vec<TargetFailure>,
}
