//! Paceline - Run Training Tracker
//!
//! Headless entry point: runs the start-up sequence once, reports the
//! current week and exits after pending pushes have drained.

use anyhow::Context;
use paceline::format::{format_duration_minutes, format_pace};
use paceline::storage::config::{get_config_path, load_config, save_config};
use paceline::TrainingCore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Paceline v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("loading configuration")?;
    let config_path = get_config_path();
    if !config_path.exists() {
        save_config(&config).context("writing default configuration")?;
        tracing::info!("Wrote default configuration to {}", config_path.display());
    }
    tracing::info!("Data directory: {}", config.data_dir.display());

    let core = TrainingCore::open(&config).context("opening local store")?;
    let report = core.start().await.context("running start-up")?;

    tracing::info!(
        "Reconciliation: restore {:?}, migration {:?}",
        report.reconcile.restore,
        report.reconcile.migration
    );

    match core.target() {
        Some(target) => {
            let minutes = core.current_week_minutes().await?;
            tracing::info!(
                "This week: {} of {} (easy {}, tempo {})",
                format_duration_minutes(minutes),
                format_duration_minutes(target.weekly_duration_minutes),
                format_pace(target.zone2_pace_seconds_per_km),
                format_pace(target.tempo_pace_seconds_per_km)
            );
        }
        None => tracing::info!("No weekly target set"),
    }

    tracing::info!("Current streak: {} week(s)", core.current_streak());

    if let (Some(goal), Some(days)) = (core.race_goal(), core.days_until_race()) {
        tracing::info!("{} in {} day(s)", goal.race_name, days);
    }

    core.wait_for_pending_sync().await;
    tracing::info!("Sync status: {}", core.sync_status());

    Ok(())
}
