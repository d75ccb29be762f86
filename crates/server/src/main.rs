mod bootstrap;
mod event_log;
mod health;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use pricewise_core::config::{AppConfig, LoadOptions};
use pricewise_core::store::MarketStore;

fn init_logging(config: &AppConfig) {
    use pricewise_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let scheduler = Arc::clone(&app.scheduler);
    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        health::HealthState::new(app.db_pool.clone(), move || scheduler.state()),
    )
    .await?;

    let event_log = event_log::spawn(&app.events);

    if app.config.simulation.enabled {
        app.simulator.start();
    } else {
        tracing::info!(event_name = "simulation.disabled", "market simulation disabled by config");
    }
    app.scheduler.start();

    let product_count = app.store.count_products().await?;
    tracing::info!(
        event_name = "system.server.started",
        product_count,
        demand_model = app.engine.estimator().model_name(),
        "pricewise-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(event_name = "system.server.stopping", "pricewise-server stopping");

    // in-flight passes finish; the grace period only bounds how long we wait for them
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let drained = tokio::time::timeout(grace, async {
        app.simulator.stop_and_wait().await;
        app.scheduler.stop_and_wait().await;
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            grace_secs = grace.as_secs(),
            "background tasks did not finish within the grace period"
        );
    }

    event_log.abort();
    app.db_pool.close().await;
    tracing::info!(event_name = "system.server.stopped", "pricewise-server stopped");

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
