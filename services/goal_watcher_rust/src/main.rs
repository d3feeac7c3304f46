use anyhow::{Context, Result};
use dotenv::dotenv;
use goal_watcher_rust::{Config, GoalWatcher};
use goalhorn_rust_core::clients::NhlClient;
use goalhorn_rust_core::{build_notifiers, Dispatcher};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Goal Watcher...");

    let config = Config::from_env()?;
    info!(
        "Team {} | poll every {}s | channels: {:?} | feed {}",
        config.team_id,
        config.poll_interval.as_secs(),
        config.channels,
        config.nhl_api_base_url
    );

    let client = NhlClient::new(&config.nhl_api_base_url, config.http_timeout)
        .context("Failed to initialize NHL client")?;

    let notifiers = build_notifiers(
        &config.channels,
        &config.channel_settings,
        config.http_timeout,
    )
    .context("Failed to build notifiers")?;

    let mut watcher = GoalWatcher::new(
        client,
        config.team_id,
        Dispatcher::new(notifiers),
        config.poll_interval,
    );

    watcher.run().await
}
