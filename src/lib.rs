//! system-monitor library
//!
//! Host metrics collection plus a registration agent that keeps one row per
//! host up to date in a `server_info` table.
//!
//! # Modules
//!
//! - **collectors**: /proc and /sys readers (filesystems, memory, network,
//!   sensors, sessions)
//! - **process**: process enumeration with zombie handling
//! - **snapshot**: composition of readings into a [`HostSnapshot`]
//! - **store**: PostgreSQL and in-memory upsert adapters
//! - **registration**: the reconnecting registration loop
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use system_monitor::{
//!     identity::resolve_identity, MemoryStore, Registrar, RegistrationPolicy, SnapshotBuilder,
//!     SystemProbe,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let identity = resolve_identity(None, 8000);
//! let builder = SnapshotBuilder::new(SystemProbe::new(), identity, Duration::from_secs(1));
//! let store = MemoryStore::new();
//!
//! let registrar = Registrar::new(store.clone(), builder, RegistrationPolicy::default());
//! let stats = registrar.run(tokio::time::sleep(Duration::from_secs(10))).await?;
//! println!("{} cycles, {} rows", stats.successful_cycles, store.len());
//! # Ok(())
//! # }
//! ```

pub mod collectors;
pub mod config;
pub mod format;
pub mod identity;
pub mod process;
pub mod registration;
pub mod snapshot;
pub mod store;

// Re-export main types for convenience
pub use config::{Config, ConfigError, Credentials};
pub use registration::{
    LoopState, Registrar, RegistrationError, RegistrationPolicy, RegistrationStats,
};
pub use snapshot::{HostIdentity, HostProbe, HostSnapshot, SnapshotBuilder, SystemProbe};
pub use store::{Connector, MemoryStore, PgConnector, Store, StoreError};
