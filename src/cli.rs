//! CLI arguments and subcommands for system-monitor.
//!
//! This module defines the command-line interface structure using the clap library,
//! and merges CLI overrides into the file configuration.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use system_monitor::config::{load_config, Config, ConfigError};

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "system-monitor",
    about = "Host metrics API and fleet registration agent",
    long_about = "Host metrics API and fleet registration agent.\n\n\
                  Serves CPU, memory, disk, network, process, sensor and system information \
                  over HTTP, and registers live host vitals into a PostgreSQL server_info \
                  table once per second.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen address
    #[arg(long)]
    pub host: Option<String>,

    /// HTTP listen port (also the registered access port)
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Log level (overrides api.log_level)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the metrics API (default)
    Serve,

    /// Register this host in the server_info table every interval
    Register {
        /// Use an in-memory store and log each snapshot instead of writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Build one host snapshot and print it
    Snapshot {
        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: ConfigFormat,
    },

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },
}

/// Loads the configuration file (unless disabled) and applies CLI overrides.
///
/// Precedence: CLI > config file > defaults.
pub fn resolve_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(host) = &args.host {
        config.api.host = Some(host.clone());
    }
    if let Some(port) = args.port {
        config.api.port = Some(port);
    }
    if let Some(level) = args.log_level {
        config.api.log_level = Some(level.as_str().to_string());
    }

    Ok(config)
}

/// Renders a configuration in the requested format.
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Prints the effective configuration with secrets redacted.
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(&config.redacted(), format)?);
    Ok(())
}
