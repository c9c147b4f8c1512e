//! Snapshot command implementation.
//!
//! Builds a single host snapshot, exactly as the registration loop would,
//! and prints it.

use crate::cli::ConfigFormat;
use system_monitor::config::Config;
use system_monitor::identity::resolve_identity;
use system_monitor::snapshot::{SnapshotBuilder, SystemProbe};

/// Prints one primed snapshot.
pub async fn command_snapshot(
    config: &Config,
    format: ConfigFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let identity = resolve_identity(config.advertise_ip()?, config.api.port());
    let mut builder = SnapshotBuilder::new(
        SystemProbe::new(),
        identity,
        config.registration.sample_window(),
    );
    builder.prime().await;
    let snapshot = builder.build().await;

    let rendered = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&snapshot)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&snapshot)?,
        ConfigFormat::Toml => toml::to_string_pretty(&snapshot)?,
    };
    println!("{}", rendered);
    Ok(())
}
