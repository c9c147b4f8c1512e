//! PostgreSQL store adapter.

use crate::config::Credentials;
use crate::snapshot::HostSnapshot;
use crate::store::{Connector, Store, StoreError};
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info, instrument, warn};

pub const CREATE_TABLE_SQL: &str = "\
CREATE TABLE IF NOT EXISTS server_info (
    ip             TEXT PRIMARY KEY,
    hostname       TEXT NOT NULL,
    access_port    INTEGER NOT NULL,
    cpu_percent    DOUBLE PRECISION NOT NULL,
    cpu_count      INTEGER NOT NULL,
    memory_percent DOUBLE PRECISION NOT NULL,
    memory_total   DOUBLE PRECISION NOT NULL,
    disk_usage     DOUBLE PRECISION NOT NULL,
    updated_on     BIGINT NOT NULL
)";

pub const UPSERT_SQL: &str = "\
INSERT INTO server_info (
    ip, hostname, access_port, cpu_percent, cpu_count,
    memory_percent, memory_total, disk_usage, updated_on
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
ON CONFLICT (ip) DO UPDATE SET
    hostname = EXCLUDED.hostname,
    access_port = EXCLUDED.access_port,
    cpu_percent = EXCLUDED.cpu_percent,
    cpu_count = EXCLUDED.cpu_count,
    memory_percent = EXCLUDED.memory_percent,
    memory_total = EXCLUDED.memory_total,
    disk_usage = EXCLUDED.disk_usage,
    updated_on = EXCLUDED.updated_on";

/// Opens connections from configured credentials.
#[derive(Debug, Clone)]
pub struct PgConnector {
    credentials: Credentials,
}

impl PgConnector {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    fn pg_config(&self) -> tokio_postgres::Config {
        let c = &self.credentials;
        let mut config = tokio_postgres::Config::new();
        config
            .host(&c.host)
            .port(c.port)
            .user(&c.username)
            .password(&c.password)
            .dbname(&c.database)
            .connect_timeout(c.connect_timeout)
            .application_name("system-monitor");
        config
    }
}

/// A single client plus the task driving its socket.
pub struct PgStore {
    client: Client,
    connection: JoinHandle<()>,
}

#[async_trait]
impl Connector for PgConnector {
    type Conn = PgStore;

    #[instrument(skip(self), fields(host = %self.credentials.host, db = %self.credentials.database))]
    async fn connect(&self) -> Result<PgStore, StoreError> {
        let (client, connection) = self
            .pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("Database connection terminated: {}", e);
            }
        });

        if self.credentials.create_schema {
            client
                .batch_execute(CREATE_TABLE_SQL)
                .await
                .map_err(|e| StoreError::Connect(e.to_string()))?;
            debug!("Ensured server_info table exists");
        }

        info!(
            "Connected to database {}:{}/{}",
            self.credentials.host, self.credentials.port, self.credentials.database
        );
        Ok(PgStore { client, connection })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn upsert(&mut self, snapshot: &HostSnapshot) -> Result<(), StoreError> {
        let access_port = i32::from(snapshot.access_port);
        let cpu_count = i32::try_from(snapshot.cpu_count_physical).map_err(|_| {
            StoreError::Unexpected(format!(
                "cpu count {} does not fit the cpu_count column",
                snapshot.cpu_count_physical
            ))
        })?;

        self.client
            .execute(
                UPSERT_SQL,
                &[
                    &snapshot.ip,
                    &snapshot.hostname,
                    &access_port,
                    &snapshot.cpu_percent,
                    &cpu_count,
                    &snapshot.memory_percent,
                    &snapshot.memory_total_gib,
                    &snapshot.disk_usage_percent,
                    &snapshot.timestamp_ms,
                ],
            )
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn close(self) {
        drop(self.client);
        if let Err(e) = self.connection.await {
            debug!("Connection task ended abnormally: {}", e);
        }
    }
}
