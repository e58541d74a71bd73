mod bootstrap;
mod http;
mod service;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chowbot_core::config::{AppConfig, LoadOptions};
use tokio::sync::watch;

use crate::http::HttpState;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn init_logging(config: &AppConfig) {
    use chowbot_core::config::LogFormat::*;
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
    // Logging needs the loaded config, so nothing may log before this point.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = http::bind(&app.config.server.bind_address, app.config.server.port).await?;
    let http_state = HttpState::new(
        app.runtime.clone(),
        app.dispatcher.clone(),
        app.config.slack.verification_token.clone(),
    );
    let http_task = tokio::spawn(http::serve(listener, http_state, wait_for(shutdown_rx.clone())));

    let sweeper_runtime = Arc::clone(&app.runtime);
    let mut sweeper_shutdown = shutdown_rx.clone();
    let sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let purged = sweeper_runtime.sessions().purge_expired().await;
                    if purged > 0 {
                        tracing::debug!(
                            event_name = "dialogue.session.purged",
                            purged,
                            "dropped idle dialogue sessions"
                        );
                    }
                }
                _ = sweeper_shutdown.changed() => break,
            }
        }
    });

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        port = app.config.server.port,
        "chowbot-server started"
    );

    let signal_task = tokio::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "could not listen for shutdown signal");
        }
        let _ = shutdown_tx.send(true);
    });

    app.slack_runner.run_until(wait_for(shutdown_rx.clone())).await?;
    // The socket runner gives up after its retry budget; keep serving HTTP until told to stop.
    wait_for(shutdown_rx).await;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "chowbot-server stopping"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, http_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(error))) => tracing::error!(error = %error, "http listener failed"),
        Ok(Err(error)) => tracing::error!(error = %error, "http listener task aborted"),
        Err(_) => {
            tracing::warn!(grace_secs = grace.as_secs(), "http listener did not drain in time");
        }
    }
    sweeper.abort();
    signal_task.abort();

    Ok(())
}

async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
