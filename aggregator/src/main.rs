use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use analytics_common::{connect, connect_readonly, AggregatorConfig, SystemClock};
use near_aggregator::cli::Cli;
use near_aggregator::{default_registry, ClassificationBacklogDrainer, PgSession, Scheduler};
use near_rpc::{ContractCodeFetcher, FetcherConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("near_aggregator=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    info!("🚀 Starting NEAR aggregator");

    // Load configuration
    let config = AggregatorConfig::from_env()?;
    config.validate()?;

    let registry = default_registry()?;
    registry.validate()?;

    let clock = SystemClock;
    let mode = cli.run_mode(&clock)?;
    let names = cli.requested(&registry);
    info!("📋 {} aggregations requested for {}", names.len(), mode);

    let indexer = connect_readonly(&config.indexer_database_url, "indexer").await?;
    let analytics = connect(&config.analytics_database_url, "analytics").await?;

    let drainer = match &config.near_rpc_url {
        Some(rpc_url) => {
            let fetcher = ContractCodeFetcher::new(FetcherConfig {
                rpc_url: rpc_url.clone(),
                timeout_seconds: config.rpc_timeout_seconds,
                max_attempts: config.rpc_max_attempts,
                retry_delay_ms: config.rpc_retry_delay_ms,
                ..Default::default()
            })?;
            info!("📡 Contract classification enabled via {}", rpc_url);
            Some(ClassificationBacklogDrainer::new(
                fetcher,
                config.classification_batch_size,
            ))
        }
        None => None,
    };

    let scheduler = Scheduler::new(&registry, &clock);
    let scheduler = match &drainer {
        Some(drainer) => scheduler.with_enricher(drainer),
        None => scheduler,
    };

    let mut session = PgSession::begin(&indexer, &analytics).await?;
    let result = scheduler.run_all(&mut session, &names, mode).await;
    session.close().await?;

    match result {
        Ok(()) => {
            info!("✅ All aggregations finished");
            Ok(())
        }
        Err(e) => {
            error!("❌ Aggregation run failed: {}", e);
            Err(e.into())
        }
    }
}
