//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::{render_config, ConfigFormat};
use system_monitor::config::Config;

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::template();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("system-monitor.yaml"),
    };

    let mut content = render_config(&config, format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# System Monitor Configuration
# ============================
#
# API
# ---
# api.host: "0.0.0.0"                  # Listen address
# api.port: 8000                       # Listen port, also registered as access_port
# api.log_level: "info"                # off, error, warn, info, debug, trace
#
# Database (required by `system-monitor register`)
# ------------------------------------------------
# database.host / port / username / password / db
# database.connect_timeout_secs: 10    # Per connection attempt
# database.create_schema: false        # CREATE TABLE IF NOT EXISTS server_info on connect
#
# Registration
# ------------
# registration.interval_secs: 1             # Pause after each successful upsert
# registration.reconnect_backoff_secs: 5    # Pause between failed reconnects
# registration.sample_window_ms: 1000       # CPU sampling window
# registration.advertise_ip: null           # Registered IP (null = auto-detect)
"#;

    format!("{comments}\n{yaml}")
}
