//! system-monitor
//!
//! Host metrics API and fleet registration agent with tracing logging.
//! This is the main entry point that initializes the server and handles subcommands.

mod cli;
mod commands;
mod handlers;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing::level_filters::LevelFilter;

use cli::{resolve_config, show_config, Args, Commands};
use commands::{command_config, command_register, command_snapshot};
use state::AppState;
use system_monitor::config::{parse_log_level, validate_effective_config, Config};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config) {
    let log_level = parse_log_level(config.api.log_level()).unwrap_or(LevelFilter::INFO);

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {}", log_level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Config {
    let config = match resolve_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration invalid: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    config
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Serves the metrics API until a shutdown signal arrives.
async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", config.api.host(), config.api.port()).parse()?;
    let state = Arc::new(AppState::new(config));
    let app = handlers::router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("system-monitor listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {}", e);
            e
        })?;

    info!("system-monitor stopped gracefully");
    Ok(())
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args);

        if args.check_config {
            match config.as_ref().map_err(|e| e.to_string()).and_then(|c| {
                validate_effective_config(c).map_err(|e| e.to_string())
            }) {
                Ok(()) => {
                    println!("✅ Configuration is valid");
                    return Ok(());
                }
                Err(e) => {
                    eprintln!("❌ Configuration invalid: {}", e);
                    std::process::exit(1);
                }
            }
        }

        return show_config(&config?, args.config_format);
    }

    // Config generation needs neither a loaded config nor logging
    if let Some(Commands::Config {
        output,
        format,
        commented,
    }) = &args.command
    {
        return command_config(output.clone(), *format, *commented);
    }

    let config = load_validated_config(&args);
    setup_logging(&config);

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            info!("Starting system-monitor API v{}", env!("CARGO_PKG_VERSION"));
            serve(config).await
        }
        Commands::Register { dry_run } => {
            info!("Starting system-monitor registration v{}", env!("CARGO_PKG_VERSION"));
            if let Err(e) = command_register(&config, dry_run, shutdown_signal()).await {
                error!("❌ Registration failed: {}", e);
                eprintln!("❌ Registration failed: {}", e);
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Snapshot { format } => command_snapshot(&config, format).await,
        Commands::Config { .. } => Ok(()),
    }
}
