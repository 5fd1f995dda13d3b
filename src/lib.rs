pub mod app;

pub use app::adb::bridge::{AdbBridge, Bridge};
pub use app::coordinator::{process_all, LockScreenDisabler};
pub use app::error::AppError;
pub use app::models::{ExecutionResult, RunReport, RunSnapshot};

/// Runs the command-line tool with the process arguments and returns its exit code.
pub fn run() -> i32 {
    app::cli::run(std::env::args().skip(1))
}
