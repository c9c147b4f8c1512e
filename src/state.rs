//! Application state management for the API server.
//!
//! This module defines the shared application state passed to HTTP handlers.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use system_monitor::config::Config;
use system_monitor::process::ProcessTable;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    pub config: Arc<Config>,
    /// Window for interval-based CPU sampling.
    pub sample_window: Duration,
    /// Kept across requests so per-process CPU usage has a baseline.
    pub processes: Mutex<ProcessTable>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let sample_window = config.registration.sample_window();
        Self {
            config: Arc::new(config),
            sample_window,
            processes: Mutex::new(ProcessTable::new()),
            start_time: Instant::now(),
        }
    }

    /// Locks the process table; a panic in another holder does not poison it.
    pub fn process_table(&self) -> MutexGuard<'_, ProcessTable> {
        match self.processes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
