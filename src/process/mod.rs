//! Process enumeration for the process endpoint.
//!
//! This module provides:
//! - `table`: sysinfo-backed enumeration
//! - `scanner`: thread and connection counts from /proc/<pid>
//! - `entry`: assembly of the reported entries, including zombie handling

pub mod entry;
pub mod scanner;
pub mod table;

pub use entry::{build_entries, ProcessEntry, RawProcess};
pub use scanner::{read_detail, DetailError, ProcessDetail};
pub use table::ProcessTable;
