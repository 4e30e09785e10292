//! personal-digest: periodic personal data aggregator.
//! Collects local and remote sources, summarizes them with an LLM and writes the day's
//! CSV log, context snapshot and markdown page.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use personal_digest::config::AppConfig;
use personal_digest::error::classify;
use personal_digest::history;
use personal_digest::metrics::Metrics;
use personal_digest::scheduler::{spawn_signal_listener, Scheduler, Shutdown};
use personal_digest::Aggregator;

#[derive(Debug, Parser)]
#[command(name = "personal-digest", version, about)]
struct Cli {
    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,
    /// Create today's output directory and CSV header, then exit.
    #[arg(long, conflicts_with = "once")]
    setup: bool,
    /// TOML config file (overrides $DIGEST_CONFIG_PATH).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!(code = classify(&e), error = ?e, "fatal error");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Arc::new(AppConfig::load(cli.config.as_deref()).context("loading configuration")?);
    info!(
        interval_minutes = config.interval_minutes,
        llm = %config.llm.describe(),
        latitude = config.weather.latitude,
        longitude = config.weather.longitude,
        optional_sources = ?config.enabled_optional_sources(),
        "configuration loaded"
    );

    if let Some(addr) = config.metrics_addr {
        Metrics::serve(addr)?;
    }

    let aggregator = Aggregator::from_config(Arc::clone(&config))?;
    let today = Local::now().date_naive();
    aggregator.ensure_partition(today).await?;

    if cli.setup {
        let previous = history::load_previous(&config.output_dir).await;
        info!(
            dir = %aggregator.partition_for(today).dir().display(),
            previous_summary = previous.summary.is_some(),
            previous_context = previous.context.is_some(),
            "setup complete"
        );
        return Ok(());
    }
    if cli.once {
        let res = aggregator.run_cycle().await?;
        info!(sections = res.sections.len(), index = res.markdown_index, "single cycle complete");
        return Ok(());
    }

    let shutdown = Shutdown::new();
    spawn_signal_listener(
        Arc::clone(&shutdown),
        Duration::from_millis(config.shutdown_grace_ms),
    )?;
    Scheduler::new(aggregator, config.interval(), shutdown)
        .run()
        .await;
    Ok(())
}
