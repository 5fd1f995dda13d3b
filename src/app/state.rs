use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::app::models::{DeviceOutcome, RunSnapshot, TargetFailure};

#[derive(Default)]
struct Tally {
    success_count: usize,
    failures: Vec<TargetFailure>,
}

/// Outcome counters shared by every device worker of one batch.
pub struct RunStatistics {
    tally: Mutex<Tally>,
    total_targets: usize,
}

impl RunStatistics {
    pub fn new(total_targets: usize) -> Self {
        Self {
            tally: Mutex::new(Tally::default()),
            total_targets,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tally> {
        // Tally updates are single statements, so a poisoned guard is still consistent.
        self.tally.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, serial: &str, outcome: DeviceOutcome) {
        let mut tally = self.lock();
        match outcome {
            DeviceOutcome::Success(_) => tally.success_count += 1,
            DeviceOutcome::Failed(reason) => tally.failures.push(TargetFailure {
                serial: serial.to_string(),
                reason,
            }),
        }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let tally = self.lock();
        RunSnapshot {
            success_count: tally.success_count,
            failed_targets: tally
                .failures
                .iter()
                .map(|failure| failure.serial.clone())
                .collect(),
            total_targets: self.total_targets,
            failures: tally.failures.clone(),
        }
    }
}
