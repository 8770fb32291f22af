//! Dependency scheduler
//!
//! `run` resolves the full dependency plan before touching the database,
//! then computes each aggregation of the plan in order (dependencies
//! first) inside the caller's session. Success commits; any failure rolls
//! back both connections and is returned.

use std::fmt;
use std::time::Instant;

use analytics_common::{
    is_supported_timestamp, AnalyticsError, Clock, ExecutionWindow, Periodicity, TimeRange,
    DAY_SECONDS, MAX_TIMESTAMP_SECONDS,
};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::aggregations::{Aggregation, Enrichment};
use crate::backfill::windows_since_genesis;
use crate::error::AggregatorError;
use crate::registry::AggregationRegistry;
use crate::session::{Database, Session};
use crate::store::store;

/// What period a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// The window containing this unix timestamp (seconds)
    At(i64),
    /// Everything since genesis, recreating destination tables
    FullHistory,
}

impl RunMode {
    /// Interpret the `--timestamp` / `--all` options
    pub fn from_options(
        timestamp: Option<i64>,
        all: bool,
        clock: &dyn Clock,
    ) -> Result<Self, AggregatorError> {
        match (timestamp, all) {
            (Some(_), true) => Err(AggregatorError::Configuration(
                "A timestamp cannot be combined with the all-history flag".to_string(),
            )),
            (Some(timestamp), false) if !is_supported_timestamp(timestamp) => {
                Err(AggregatorError::Configuration(format!(
                    "Timestamp {} is out of range (expected 0..={})",
                    timestamp, MAX_TIMESTAMP_SECONDS
                )))
            }
            (Some(timestamp), false) => Ok(RunMode::At(timestamp)),
            (None, true) => Ok(RunMode::FullHistory),
            (None, false) => Ok(RunMode::At(clock.now() - DAY_SECONDS)),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::At(timestamp) => {
                match Periodicity::Daily.window_containing(*timestamp).start_date() {
                    Some(date) => write!(f, "{}", date),
                    None => write!(f, "timestamp {}", timestamp),
                }
            }
            RunMode::FullHistory => write!(f, "all period"),
        }
    }
}

/// Post-store step for aggregations that request one
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(
        &self,
        enrichment: Enrichment,
        session: &mut dyn Session,
    ) -> Result<(), AggregatorError>;
}

pub struct Scheduler<'a> {
    registry: &'a AggregationRegistry,
    clock: &'a dyn Clock,
    enricher: Option<&'a dyn Enricher>,
}

impl<'a> Scheduler<'a> {
    pub fn new(registry: &'a AggregationRegistry, clock: &'a dyn Clock) -> Self {
        Self {
            registry,
            clock,
            enricher: None,
        }
    }

    pub fn with_enricher(mut self, enricher: &'a dyn Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Execution order for `name`: every dependency once, before its dependents
    pub fn resolve(&self, name: &str) -> Result<Vec<&'a dyn Aggregation>, AggregatorError> {
        self.registry.execution_plan(name)
    }

    /// Compute `name` and its dependencies as one transaction
    pub async fn run(
        &self,
        session: &mut dyn Session,
        name: &str,
        mode: RunMode,
    ) -> Result<(), AggregatorError> {
        let plan = self.resolve(name)?;
        debug!(
            "Plan for {}: {}",
            name,
            plan.iter().map(|a| a.name()).collect::<Vec<_>>().join(" -> ")
        );

        match self.execute_plan(session, &plan, mode).await {
            Ok(()) => {
                session.commit().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_error) = session.rollback().await {
                    error!("Rollback after failed {} failed: {}", name, rollback_error);
                }
                Err(e)
            }
        }
    }

    /// Run every name, continuing past failures; returns the first failure
    pub async fn run_all(
        &self,
        session: &mut dyn Session,
        names: &[String],
        mode: RunMode,
    ) -> Result<(), AggregatorError> {
        let mut first_error = None;

        for name in names {
            if let Err(e) = self.run(session, name, mode).await {
                error!("❌ Failed to compute {} for {}: {}", name, mode, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn execute_plan(
        &self,
        session: &mut dyn Session,
        plan: &[&dyn Aggregation],
        mode: RunMode,
    ) -> Result<(), AggregatorError> {
        for aggregation in plan {
            let start = Instant::now();
            info!("Computing {} for {}...", aggregation.name(), mode);

            self.compute(session, *aggregation, mode)
                .await
                .map_err(|e| AggregatorError::compute(aggregation.name(), e))?;

            if let Some(enrichment) = aggregation.enrichment() {
                self.enrich(session, enrichment).await?;
            }

            info!(
                "✅ Computed {} for {} in {:.1}s",
                aggregation.name(),
                mode,
                start.elapsed().as_secs_f64()
            );
        }
        Ok(())
    }

    async fn compute(
        &self,
        session: &mut dyn Session,
        aggregation: &dyn Aggregation,
        mode: RunMode,
    ) -> Result<(), AnalyticsError> {
        match mode {
            RunMode::At(timestamp) => {
                let window = aggregation.periodicity().window_containing(timestamp);
                session
                    .batch_execute(Database::Analytics, aggregation.create_table_sql())
                    .await?;
                self.compute_window(session, aggregation, Some(&window), window.time_range())
                    .await?;
            }
            RunMode::FullHistory => {
                session
                    .batch_execute(Database::Analytics, &aggregation.drop_table_sql())
                    .await?;
                session
                    .batch_execute(Database::Analytics, aggregation.create_table_sql())
                    .await?;

                if aggregation.computable_in_one_pass() {
                    self.compute_window(session, aggregation, None, TimeRange::unbounded())
                        .await?;
                } else {
                    let windows = windows_since_genesis(aggregation.periodicity(), self.clock.now());
                    info!(
                        "Backfilling {} over {} {} windows",
                        aggregation.name(),
                        windows.len(),
                        aggregation.periodicity()
                    );
                    for window in windows {
                        debug!("Computing {} for {}", aggregation.name(), window);
                        self.compute_window(session, aggregation, Some(&window), window.time_range())
                            .await?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn compute_window(
        &self,
        session: &mut dyn Session,
        aggregation: &dyn Aggregation,
        window: Option<&ExecutionWindow>,
        range: TimeRange,
    ) -> Result<u64, AnalyticsError> {
        let rows = session
            .query(aggregation.source(), aggregation.select_sql(), range)
            .await?;
        let rows = aggregation.prepare_rows(rows, window);
        store(session, aggregation, &rows).await
    }

    async fn enrich(
        &self,
        session: &mut dyn Session,
        enrichment: Enrichment,
    ) -> Result<(), AggregatorError> {
        match self.enricher {
            Some(enricher) => enricher.enrich(enrichment, session).await,
            None => {
                warn!(
                    "⚠️ NEAR_RPC_URL is not set, skipping {:?} enrichment",
                    enrichment
                );
                Ok(())
            }
        }
    }
}
