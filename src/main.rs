//! Tank Duel - headless match runner
//!
//! Plays an autoplay match between two AI tanks:
//! - Ticks the simulation at a fixed frame rate
//! - Autosaves the match to a JSON slot after every turn
//! - Resumes from the slot on start

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tank_duel::app::Session;
use tank_duel::config::Config;
use tank_duel::store::FileSlot;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level);

    info!("Starting Tank Duel");
    info!(
        seed = config.seed,
        tps = config.tps,
        save_path = %config.save_path.display(),
        "Configuration loaded"
    );

    let slot = FileSlot::new(config.save_path.clone());
    let mut session = Session::new(config, slot)?;
    let summary = session.run_until(shutdown_signal()).await;

    let id = summary.match_id;
    match summary.winner {
        Some(winner) => info!(match_id = %id, %winner, ticks = summary.ticks, "Winner decided"),
        None if summary.game_over => info!(match_id = %id, ticks = summary.ticks, "Match drawn"),
        None => info!(match_id = %id, ticks = summary.ticks, "Match suspended"),
    }

    info!("Shutdown complete");
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

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, saving and stopping");
        }
        _ = terminate => {
            info!("Received terminate signal, saving and stopping");
        }
    }
}
