//! In-process store keyed by IP.

use crate::snapshot::HostSnapshot;
use crate::store::{Connector, Store, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Map-backed store with the same upsert contract as `server_info`.
///
/// Clones share the same rows, so the connector and every connection it hands
/// out observe each other's writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<HashMap<String, HostSnapshot>>>,
    log_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs every upserted snapshot at info level.
    pub fn with_write_logging(mut self) -> Self {
        self.log_writes = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, HostSnapshot>> {
        match self.rows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn get(&self, ip: &str) -> Option<HostSnapshot> {
        self.lock().get(ip).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All rows ordered by IP.
    pub fn rows(&self) -> Vec<HostSnapshot> {
        let mut rows: Vec<_> = self.lock().values().cloned().collect();
        rows.sort_by(|a, b| a.ip.cmp(&b.ip));
        rows
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert(&mut self, snapshot: &HostSnapshot) -> Result<(), StoreError> {
        if self.log_writes {
            info!(
                ip = %snapshot.ip,
                cpu = snapshot.cpu_percent,
                memory = snapshot.memory_percent,
                disk = snapshot.disk_usage_percent,
                "Snapshot"
            );
        }
        self.lock().insert(snapshot.ip.clone(), snapshot.clone());
        Ok(())
    }

    async fn close(self) {}
}

#[async_trait]
impl Connector for MemoryStore {
    type Conn = MemoryStore;

    async fn connect(&self) -> Result<MemoryStore, StoreError> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ip: &str, cpu: f64) -> HostSnapshot {
        HostSnapshot {
            ip: ip.into(),
            hostname: "node".into(),
            access_port: 8000,
            cpu_percent: cpu,
            cpu_count_physical: 2,
            memory_percent: 10.0,
            memory_total_gib: 4.0,
            disk_usage_percent: 50.0,
            timestamp_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_latest_upsert_wins() {
        let connector = MemoryStore::new();
        let mut conn = connector.connect().await.unwrap();
        conn.upsert(&snapshot("10.0.0.1", 1.0)).await.unwrap();
        conn.upsert(&snapshot("10.0.0.1", 2.0)).await.unwrap();
        conn.upsert(&snapshot("10.0.0.2", 3.0)).await.unwrap();

        assert_eq!(connector.len(), 2);
        assert_eq!(connector.get("10.0.0.1").unwrap().cpu_percent, 2.0);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let connector = MemoryStore::new();
        let mut conn = connector.connect().await.unwrap();
        let s = snapshot("10.0.0.1", 5.0);
        conn.upsert(&s).await.unwrap();
        let once = connector.rows();
        conn.upsert(&s).await.unwrap();
        assert_eq!(connector.rows(), once);
    }
}
