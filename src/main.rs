//! Arena Server - headless authoritative host
//!
//! Runs one arena: a fixed-timestep simulation fed by player input over a
//! channel, broadcasting world snapshots at the configured rate.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use arena_server::config::Config;
use arena_server::game::{GameMatch, MatchRegistry};
use arena_server::util::time::{init_server_time, uptime_secs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.log_level);
    init_server_time();

    info!("Starting Arena Server");

    let settings = config.match_settings();
    info!(
        tps = settings.simulation_tps,
        snapshot_tps = settings.snapshot_tps,
        width = settings.map.width,
        height = settings.map.height,
        seed = settings.seed,
        max_players = settings.max_players,
        "Arena settings"
    );

    let registry = Arc::new(MatchRegistry::new());
    let (game_match, handle) = GameMatch::new(Uuid::new_v4(), settings);
    let match_id = handle.id;
    registry.insert(handle);

    let arena = tokio::spawn(game_match.run());
    info!(match_id = %match_id, active_matches = registry.active_matches(), "Arena registered");

    shutdown_signal().await;
    info!(connected_players = registry.total_players(), "Closing arena");

    // Dropping the last handle closes the input channel and ends the loop
    registry.remove(&match_id);
    arena.await?;

    info!(uptime_secs = uptime_secs(), "Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
