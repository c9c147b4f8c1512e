//! Register command implementation.
//!
//! Runs the registration loop against PostgreSQL, or against an in-memory
//! store with `--dry-run`.

use std::future::Future;
use tracing::info;

use system_monitor::config::Config;
use system_monitor::identity::resolve_identity;
use system_monitor::registration::{Registrar, RegistrationPolicy, RegistrationStats};
use system_monitor::snapshot::{SnapshotBuilder, SystemProbe};
use system_monitor::store::{Connector, MemoryStore, PgConnector};

async fn run_with<C, F>(
    connector: C,
    config: &Config,
    shutdown: F,
) -> Result<RegistrationStats, Box<dyn std::error::Error>>
where
    C: Connector,
    F: Future<Output = ()>,
{
    let identity = resolve_identity(config.advertise_ip()?, config.api.port());
    info!(
        "Registering as {} ({}), access port {}",
        identity.ip, identity.hostname, identity.access_port
    );

    let builder = SnapshotBuilder::new(
        SystemProbe::new(),
        identity,
        config.registration.sample_window(),
    );
    let policy = RegistrationPolicy::from_config(&config.registration);

    let stats = Registrar::new(connector, builder, policy)
        .run(shutdown)
        .await?;
    Ok(stats)
}

/// Runs registration until `shutdown` resolves.
///
/// Missing database credentials and a failed initial connection are errors;
/// everything after startup is retried inside the loop.
pub async fn command_register<F>(
    config: &Config,
    dry_run: bool,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()>,
{
    let stats = if dry_run {
        info!("Dry run: snapshots are kept in memory and logged");
        run_with(MemoryStore::new().with_write_logging(), config, shutdown).await?
    } else {
        let credentials = config.database.credentials()?;
        run_with(PgConnector::new(credentials), config, shutdown).await?
    };

    info!(
        "Registration finished after {} successful cycles",
        stats.successful_cycles
    );
    Ok(())
}
