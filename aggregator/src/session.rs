//! Database session shared by one top-level aggregation invocation
//!
//! A session owns the transaction on both connections. Every store for an
//! invocation's dependency chain goes through the same session, so a failure
//! anywhere rolls back everything written for that invocation.

use std::fmt;

use analytics_common::{row_values, AnalyticsError, ComputedRow, TimeRange};
use async_trait::async_trait;
use futures::future::try_join_all;
use tokio_postgres::Client;
use tracing::{debug, warn};

use crate::contracts::{ClassificationTarget, SdkType};

/// Which of the two connections a statement runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Database {
    /// Source ledger, read-only
    Indexer,
    /// Destination tables, read-write
    Analytics,
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Database::Indexer => write!(f, "indexer"),
            Database::Analytics => write!(f, "analytics"),
        }
    }
}

/// Access to `unique_contracts` rows pending classification
#[async_trait]
pub trait ContractRegistry: Send {
    /// Up to `limit` contracts whose `contract_sdk_type` is still unset
    async fn pending_classifications(
        &mut self,
        limit: usize,
    ) -> Result<Vec<ClassificationTarget>, AnalyticsError>;

    /// Apply labels in one statement; rows already labelled are left alone
    async fn set_sdk_types(&mut self, updates: &[(String, SdkType)]) -> Result<u64, AnalyticsError>;

    /// Make everything written so far durable
    async fn commit(&mut self) -> Result<(), AnalyticsError>;
}

#[async_trait]
pub trait Session: ContractRegistry {
    /// Run DDL (possibly several statements) on `database`
    async fn batch_execute(&mut self, database: Database, sql: &str) -> Result<(), AnalyticsError>;

    /// Run a window select with `$1`/`$2` bound to the range
    async fn query(
        &mut self,
        database: Database,
        sql: &str,
        range: TimeRange,
    ) -> Result<Vec<ComputedRow>, AnalyticsError>;

    /// Insert rows into the analytics database, returning rows written
    async fn insert(&mut self, sql: &str, rows: &[ComputedRow]) -> Result<u64, AnalyticsError>;

    /// Discard everything since the last commit on both connections
    async fn rollback(&mut self) -> Result<(), AnalyticsError>;
}

const SELECT_PENDING_CLASSIFICATIONS: &str = r#"
    SELECT contract_code_sha256, first_deployed_to_account_id, first_deployed_at_block_hash
    FROM unique_contracts
    WHERE contract_sdk_type = ''
    ORDER BY first_deployed_at_block_timestamp
    LIMIT $1
"#;

const UPDATE_SDK_TYPES: &str = r#"
    UPDATE unique_contracts AS u
    SET contract_sdk_type = v.sdk_type
    FROM UNNEST($1::text[], $2::text[]) AS v(contract_code_sha256, sdk_type)
    WHERE u.contract_code_sha256 = v.contract_code_sha256
        AND u.contract_sdk_type = ''
"#;

/// Inserts in flight at once on the analytics connection
const INSERT_PIPELINE_DEPTH: usize = 1000;

/// Session over live PostgreSQL connections
pub struct PgSession<'a> {
    indexer: &'a Client,
    analytics: &'a Client,
}

impl<'a> PgSession<'a> {
    /// Open a transaction on both connections
    pub async fn begin(indexer: &'a Client, analytics: &'a Client) -> Result<Self, AnalyticsError> {
        indexer.batch_execute("BEGIN").await?;
        analytics.batch_execute("BEGIN").await?;
        Ok(Self { indexer, analytics })
    }

    /// End the session, discarding the trailing (empty) transaction
    pub async fn close(self) -> Result<(), AnalyticsError> {
        self.indexer.batch_execute("ROLLBACK").await?;
        self.analytics.batch_execute("ROLLBACK").await?;
        Ok(())
    }

    fn client(&self, database: Database) -> &'a Client {
        match database {
            Database::Indexer => self.indexer,
            Database::Analytics => self.analytics,
        }
    }
}

#[async_trait]
impl ContractRegistry for PgSession<'_> {
    async fn pending_classifications(
        &mut self,
        limit: usize,
    ) -> Result<Vec<ClassificationTarget>, AnalyticsError> {
        let limit = i64::try_from(limit)
            .map_err(|_| AnalyticsError::Query(format!("Batch size {} is too large", limit)))?;

        let rows = self
            .analytics
            .query(SELECT_PENDING_CLASSIFICATIONS, &[&limit])
            .await?;

        rows.iter()
            .map(|row| -> Result<ClassificationTarget, AnalyticsError> {
                Ok(ClassificationTarget {
                    content_hash: row.try_get(0)?,
                    account_id: row.try_get(1)?,
                    block_hash: row.try_get(2)?,
                })
            })
            .collect()
    }

    async fn set_sdk_types(&mut self, updates: &[(String, SdkType)]) -> Result<u64, AnalyticsError> {
        if updates.is_empty() {
            return Ok(0);
        }

        let hashes: Vec<&str> = updates.iter().map(|(hash, _)| hash.as_str()).collect();
        let labels: Vec<&str> = updates.iter().map(|(_, sdk_type)| sdk_type.as_str()).collect();

        let updated = self
            .analytics
            .execute(UPDATE_SDK_TYPES, &[&hashes, &labels])
            .await?;
        debug!("Set SDK type on {} of {} contracts", updated, updates.len());
        Ok(updated)
    }

    async fn commit(&mut self) -> Result<(), AnalyticsError> {
        self.indexer.batch_execute("COMMIT; BEGIN").await?;
        self.analytics.batch_execute("COMMIT; BEGIN").await?;
        Ok(())
    }
}

#[async_trait]
impl Session for PgSession<'_> {
    async fn batch_execute(&mut self, database: Database, sql: &str) -> Result<(), AnalyticsError> {
        self.client(database).batch_execute(sql).await?;
        Ok(())
    }

    async fn query(
        &mut self,
        database: Database,
        sql: &str,
        range: TimeRange,
    ) -> Result<Vec<ComputedRow>, AnalyticsError> {
        let rows = self
            .client(database)
            .query(sql, &[&range.from_nanos, &range.to_nanos])
            .await?;
        rows.iter().map(row_values).collect()
    }

    async fn insert(&mut self, sql: &str, rows: &[ComputedRow]) -> Result<u64, AnalyticsError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let statement = self.analytics.prepare(sql).await?;
        let mut inserted = 0;

        // Concurrent executes on one client are pipelined by the driver
        for chunk in rows.chunks(INSERT_PIPELINE_DEPTH) {
            let params: Vec<_> = chunk.iter().map(ComputedRow::params).collect();
            let counts = try_join_all(
                params
                    .iter()
                    .map(|row_params| self.analytics.execute(&statement, row_params)),
            )
            .await?;
            inserted += counts.iter().sum::<u64>();
        }
        Ok(inserted)
    }

    async fn rollback(&mut self) -> Result<(), AnalyticsError> {
        // Both sides are attempted even if the first fails
        let indexer = self.indexer.batch_execute("ROLLBACK; BEGIN").await;
        let analytics = self.analytics.batch_execute("ROLLBACK; BEGIN").await;

        if let Err(e) = &analytics {
            warn!("Analytics rollback failed: {}", e);
        }
        indexer?;
        analytics?;
        Ok(())
    }
}
