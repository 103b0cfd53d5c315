//! Shared helpers for connector integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thermobridge_connectors::ProcessExit;

/// Close timeout short enough to keep hanging-close tests fast
pub const TEST_CLOSE_TIMEOUT: Duration = Duration::from_millis(50);

/// Exit handler that records codes instead of ending the test process
#[derive(Debug, Clone, Default)]
pub struct RecordingExit {
    codes: Arc<Mutex<Vec<i32>>>,
}

impl RecordingExit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every code exit was invoked with, in order
    pub fn codes(&self) -> Vec<i32> {
        self.codes.lock().unwrap().clone()
    }
}

impl ProcessExit for RecordingExit {
    fn exit(&mut self, code: i32) {
        self.codes.lock().unwrap().push(code);
    }
}

/// The reading sequence a healthy sensor might emit over a few seconds
pub const SENSOR_SCRIPT: [&str; 5] = ["21.3\n", "22.0\n", "bad\n", "22.0\n", "19.9\n"];
