//! CLI command implementations for system-monitor.
//!
//! This module provides implementations for the subcommands besides `serve`:
//! - `register`: Registration loop
//! - `snapshot`: One-off snapshot
//! - `config`: Configuration file generation

pub mod config;
pub mod register;
pub mod snapshot;

// Re-export command functions
pub use config::command_config;
pub use register::command_register;
pub use snapshot::command_snapshot;
