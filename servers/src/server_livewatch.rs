//! # Live-Status Broadcast Server
//!
//! Polls Twitch and YouTube for a fixed roster of creators and pushes one
//! consolidated status snapshot per cycle to every connected browser.
//!
//! ## Functionality:
//! - **Static UI**: files under `public_dir` are served at `/`.
//! - **WebSocket Transport**: `/ws` clients receive a `statusUpdate` event per
//!   completed cycle; every new connection requests a refresh.
//! - **Refresh Timer**: a cron job (every minute by default) triggers cycles.
//!   Overlapping triggers are coalesced so only one cycle runs at a time.
//! - **Graceful Shutdown**: `CTRL+C` / `SIGTERM` stop the timer and drain the
//!   HTTP server.
//!
//! Configuration comes from defaults, `server_livewatch.conf`, environment
//! variables (`.env` files included) and CLI flags, in increasing precedence.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use lib_livewatch::configs::load_roster;
use lib_livewatch::core::{Aggregator, Dispatcher, Scheduler, StatusCycle};
use lib_livewatch::loggers::setup_logging;
use lib_livewatch::sources::{TwitchSource, YoutubeSource};

mod livewatch_logic;
use livewatch_logic::{config, downstream, timer};

const APP_NAME: &str = "server_livewatch";

/// Loads `.env`, then the platform specific `.env.windows` / `.env.linux`.
fn load_dotenv() {
    let dotenv_os: &str = if cfg!(target_os = "windows") {
        ".env.windows"
    } else {
        ".env.linux"
    };
    dotenvy::dotenv().ok();
    dotenvy::from_filename(dotenv_os).ok();
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    let settings = config::load_config()?;
    let _log_guard = setup_logging(&settings.log_dir, &settings.log_level, APP_NAME)
        .context("Failed to initialize logging")?;
    if let Some(path) = &settings.config_file {
        info!("Merged configuration from {}", path.display());
    }

    let roster = load_roster(&settings.roster_path)
        .with_context(|| format!("Failed to load roster {}", settings.roster_path.display()))?;
    if roster.is_empty() {
        warn!("Roster is empty; snapshots will be empty arrays");
    }

    let twitch = Arc::new(TwitchSource::new(&settings.twitch)?);
    let youtube = Arc::new(YoutubeSource::new(&settings.youtube)?);
    let aggregator = Aggregator::new(twitch, youtube).with_max_concurrency(settings.max_concurrency);

    let dispatcher = Arc::new(Dispatcher::new());
    let cycle = Arc::new(StatusCycle::new(aggregator, roster, dispatcher.clone()));
    let scheduler = Scheduler::new(cycle);

    let mut refresh_timer = timer::start_timer(&settings.cron_schedule, scheduler.clone())
        .await
        .with_context(|| format!("Invalid refresh schedule '{}'", settings.cron_schedule))?;

    // First snapshot right away instead of at the next tick.
    scheduler.trigger();

    let state = downstream::AppState {
        dispatcher,
        scheduler,
    };
    let served = downstream::run(settings.port, &settings.public_dir, state, shutdown_signal()).await;

    if let Err(e) = refresh_timer.shutdown().await {
        warn!("Failed to stop refresh timer: {}", e);
    }
    served?;

    info!("Shutdown complete.");
    Ok(())
}

/// Resolves on `CTRL+C`, or `SIGTERM` on UNIX.
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
            Ok(mut term) => {
                term.recv().await;
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
        _ = ctrl_c => info!("Ctrl-C received, initiating shutdown."),
        _ = terminate => info!("SIGTERM received, initiating shutdown."),
    }
}
