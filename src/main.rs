//! Main entry point for the Commander Ladder rating service
//!
//! Loads configuration, optionally imports a dataset of players and games,
//! and keeps the league leaderboard refreshed until shutdown.

use anyhow::Result;
use clap::Parser;
use commander_ladder::config::AppConfig;
use commander_ladder::leaderboard::LeaderBoardEntry;
use commander_ladder::service::{AppState, Dataset};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};

/// Commander Ladder - TrueSkill ratings and league leaderboard
#[derive(Parser)]
#[command(
    name = "commander-ladder",
    version,
    about = "TrueSkill rating service with a league leaderboard",
    long_about = "Commander Ladder records game outcomes between players, updates their \
                 TrueSkill ratings and periodically projects all players into a league \
                 leaderboard (Uber, Platinum, Gold, Silver, Bronze)."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dataset to import on startup
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Import players and games from a JSON dataset before starting"
    )]
    import: Option<PathBuf>,

    /// Print the leaderboard and exit
    #[arg(long, help = "Rebuild and print the leaderboard once, then exit")]
    once: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 Commander Ladder Rating Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   Prior: N({:.3}, {:.3})",
        config.rating.initial_mu, config.rating.initial_sigma
    );
    info!(
        "   Beta: {:.3}, dynamics: {:.4}, draw probability: {:.2}",
        config.rating.beta, config.rating.dynamics, config.rating.draw_probability
    );
    info!(
        "   Leaderboard refresh: {}s",
        config.leaderboard.refresh_interval_seconds
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    commander_ladder::config::validate_config(&config)?;
    Ok(config)
}

fn print_leaderboard(entries: &[LeaderBoardEntry]) {
    println!(
        "{:<10} {:>5} {:>5} {:>10} {:>9}  {}",
        "League", "Rank", "Pos", "Player", "Rating", "Uber id"
    );
    for entry in entries {
        println!(
            "{:<10} {:>5} {:>5} {:>10} {:>9.3}  {}",
            entry.league.to_string(),
            entry.rank,
            entry.position,
            entry.player_id,
            entry.rating,
            entry.uber_id.as_deref().unwrap_or("-")
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let mut app_state = match AppState::new(config.clone()) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = &args.import {
        info!("Importing dataset from: {}", path.display());
        let dataset = Dataset::from_file(path)?;
        let summary = app_state.service().import(dataset)?;
        info!(
            "Imported {} players and {} games ({} games rejected)",
            summary.players_created, summary.games_processed, summary.games_rejected
        );
    }

    if args.once {
        let entries = app_state.service().rebuild_leaderboard()?;
        print_leaderboard(&entries);
        return Ok(());
    }

    info!("Starting service...");
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    info!("✅ Commander Ladder Rating Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");

    match tokio::time::timeout(config.shutdown_timeout(), app_state.shutdown()).await {
        Ok(Ok(())) => info!("✅ Graceful shutdown completed successfully"),
        Ok(Err(e)) => warn!("Shutdown finished with error: {}", e),
        Err(_) => warn!("⚠️  Shutdown timeout exceeded, forcing exit"),
    }

    info!("🛑 Commander Ladder Rating Service stopped");
    Ok(())
}
