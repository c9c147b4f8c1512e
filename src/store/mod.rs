//! Registration store adapters.
//!
//! A store persists exactly one row per host IP through an atomic
//! insert-or-update. Two adapters exist:
//! - `postgres`: the `server_info` table over tokio-postgres
//! - `memory`: an in-process map used by dry runs and tests

use crate::snapshot::HostSnapshot;
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgConnector, PgStore};

/// Store failures, classified by how the registration loop reacts to them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Opening a connection failed.
    #[error("Failed to connect to store: {0}")]
    Connect(String),

    /// The connection or the database rejected a write.
    #[error("Store transport error: {0}")]
    Transport(String),

    /// Anything else; the connection may still be healthy.
    #[error("Unexpected store error: {0}")]
    Unexpected(String),
}

impl StoreError {
    /// Whether the error warrants dropping and re-opening the connection.
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Connect(_) | StoreError::Transport(_))
    }
}

/// An open store connection.
#[async_trait]
pub trait Store: Send + Sized {
    /// Inserts the snapshot, or overwrites every mutable column of the row
    /// with the same `ip`.
    async fn upsert(&mut self, snapshot: &HostSnapshot) -> Result<(), StoreError>;

    /// Releases the connection.
    async fn close(self);
}

/// Opens store connections.
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Store;

    async fn connect(&self) -> Result<Self::Conn, StoreError>;
}
