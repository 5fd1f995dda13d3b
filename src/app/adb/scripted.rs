use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Instant;

use crate::app::adb::bridge::Bridge;
use crate::app::models::ExecutionResult;

const ANY_DEVICE: &str = "*";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub serial: Option<String>,
    pub command: String,
    pub at: Instant,
}

/// Replays canned results per (serial, command). A sequence is consumed one
/// result per call and its last entry repeats. Unscripted commands fail.
#[derive(Default)]
pub struct ScriptedBridge {
    responses: Mutex<HashMap<(String, String), VecDeque<ExecutionResult>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

pub fn ok(output: &str) -> ExecutionResult {
    ExecutionResult::success(output)
}

pub fn fail(error: &str) -> ExecutionResult {
    ExecutionResult::failure(error)
}

impl ScriptedBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, command: &str, result: ExecutionResult) -> Self {
        self.on_sequence(ANY_DEVICE, command, vec![result])
    }

    pub fn on_device(self, serial: &str, command: &str, result: ExecutionResult) -> Self {
        self.on_sequence(serial, command, vec![result])
    }

    pub fn on_sequence(self, serial: &str, command: &str, results: Vec<ExecutionResult>) -> Self {
        self.responses
            .lock()
            .expect("responses")
            .insert((serial.to_string(), command.to_string()), results.into());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn commands_for(&self, serial: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.serial.as_deref() == Some(serial))
            .map(|call| call.command)
            .collect()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.command == command)
            .count()
    }

    pub fn called(&self, command: &str) -> bool {
        self.count(command) > 0
    }
}

impl Bridge for ScriptedBridge {
    fn execute(&self, command: &str, serial: Option<&str>) -> ExecutionResult {
        self.calls.lock().expect("calls").push(RecordedCall {
            serial: serial.map(str::to_string),
            command: command.to_string(),
            at: Instant::now(),
        });

        let mut responses = self.responses.lock().expect("responses");
        let device_key = (serial.unwrap_or(ANY_DEVICE).to_string(), command.to_string());
        let any_key = (ANY_DEVICE.to_string(), command.to_string());
        let queue = if responses.contains_key(&device_key) {
            responses.get_mut(&device_key)
        } else {
            responses.get_mut(&any_key)
        };
        match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| fail("empty")),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| fail("empty")),
            None => fail(&format!("unscripted command: {command}")),
        }
    }
}
