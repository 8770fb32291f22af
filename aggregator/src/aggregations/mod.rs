//! Aggregation definitions
//!
//! Each aggregation is a destination table in the analytics database plus
//! the statements that fill it for one window:
//!
//! - `create_table_sql`: idempotent DDL (`CREATE TABLE IF NOT EXISTS`,
//!   `CREATE INDEX IF NOT EXISTS`, `ADD COLUMN IF NOT EXISTS`)
//! - `select_sql`: source query taking the window as `$1::bigint` and
//!   `$2::bigint` nanosecond bounds; day and week buckets are taken
//!   `AT TIME ZONE 'UTC'`, never in the server's TimeZone
//! - `insert_sql`: one-row insert ending in `ON CONFLICT DO NOTHING`
//!
//! ## Adding New Aggregations
//!
//! 1. Create a new file (e.g., `daily_deleted_accounts_count.rs`)
//! 2. Implement the `Aggregation` trait:
//!
//! ```ignore
//! pub struct DailyDeletedAccountsCount;
//!
//! impl Aggregation for DailyDeletedAccountsCount {
//!     fn name(&self) -> &str { "daily_deleted_accounts_count" }
//!     fn create_table_sql(&self) -> &str { "CREATE TABLE IF NOT EXISTS ..." }
//!     fn select_sql(&self) -> &str { "SELECT ... WHERE ts >= $1::bigint AND ts < $2::bigint" }
//!     fn insert_sql(&self) -> &str { "INSERT INTO ... ON CONFLICT DO NOTHING" }
//! }
//! ```
//!
//! 3. Add it to `default_registry()` in this file

use analytics_common::{ComputedRow, ExecutionWindow, Periodicity, SqlValue};

use crate::error::AggregatorError;
use crate::registry::AggregationRegistry;
use crate::session::Database;

pub mod daily_active_accounts_count;
pub mod daily_gas_used;
pub mod daily_new_accounts_count;
pub mod daily_new_unique_contracts_count;
pub mod daily_receipts_per_contract_count;
pub mod daily_transactions_count;
pub mod daily_transactions_per_account_count;
pub mod deployed_contracts;
pub mod unique_contracts;
pub mod weekly_active_accounts_count;

pub use daily_active_accounts_count::DailyActiveAccountsCount;
pub use daily_gas_used::DailyGasUsed;
pub use daily_new_accounts_count::DailyNewAccountsCount;
pub use daily_new_unique_contracts_count::DailyNewUniqueContractsCount;
pub use daily_receipts_per_contract_count::DailyReceiptsPerContractCount;
pub use daily_transactions_count::DailyTransactionsCount;
pub use daily_transactions_per_account_count::DailyTransactionsPerAccountCount;
pub use deployed_contracts::DeployedContracts;
pub use unique_contracts::UniqueContracts;
pub use weekly_active_accounts_count::WeeklyActiveAccountsCount;

/// Post-store enrichment steps an aggregation can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrichment {
    /// Resolve `contract_sdk_type` for pending rows of `unique_contracts`
    ContractSdkTypes,
}

/// Capability set of one aggregation kind
pub trait Aggregation: Send + Sync {
    /// Unique name, also the destination table name
    fn name(&self) -> &str;

    fn periodicity(&self) -> Periodicity {
        Periodicity::Daily
    }

    /// Aggregations that must be materialized for the same window first
    fn dependencies(&self) -> &[&'static str] {
        &[]
    }

    /// Whether a single select over all history fits in memory
    fn computable_in_one_pass(&self) -> bool {
        true
    }

    /// Database the select runs against
    fn source(&self) -> Database {
        Database::Indexer
    }

    fn create_table_sql(&self) -> &str;

    fn drop_table_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name())
    }

    fn select_sql(&self) -> &str;

    fn insert_sql(&self) -> &str;

    /// Reshape selected rows before storing; `window` is `None` for full-history passes
    fn prepare_rows(
        &self,
        rows: Vec<ComputedRow>,
        _window: Option<&ExecutionWindow>,
    ) -> Vec<ComputedRow> {
        rows
    }

    fn enrichment(&self) -> Option<Enrichment> {
        None
    }
}

/// Every aggregation known to the aggregator, in default run order
pub fn default_registry() -> Result<AggregationRegistry, AggregatorError> {
    let mut registry = AggregationRegistry::new();

    registry.register(DailyActiveAccountsCount)?;
    registry.register(DailyGasUsed)?;
    registry.register(DailyNewAccountsCount)?;
    registry.register(DailyNewUniqueContractsCount)?;
    registry.register(DailyReceiptsPerContractCount)?;
    registry.register(DailyTransactionsCount)?;
    registry.register(DailyTransactionsPerAccountCount)?;
    registry.register(DeployedContracts)?;
    registry.register(UniqueContracts)?;
    registry.register(WeeklyActiveAccountsCount)?;

    Ok(registry)
}

/// Zero-count row for a daily counter whose window selected nothing
pub(crate) fn zero_count_for_window(
    rows: Vec<ComputedRow>,
    window: Option<&ExecutionWindow>,
) -> Vec<ComputedRow> {
    match (rows.is_empty(), window.and_then(ExecutionWindow::start_date)) {
        (true, Some(day)) => vec![ComputedRow::new(vec![SqlValue::Date(day), SqlValue::Int(0)])],
        _ => rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_registry_resolves() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.len(), 10);
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_every_select_binds_window() {
        let registry = default_registry().unwrap();
        for aggregation in registry.iter() {
            let select = aggregation.select_sql();
            assert!(
                select.contains("$1::bigint") && select.contains("$2::bigint"),
                "{} must bind both window bounds",
                aggregation.name()
            );
        }
    }

    #[test]
    fn test_day_buckets_ignore_session_timezone() {
        let registry = default_registry().unwrap();
        for aggregation in registry.iter() {
            let select = aggregation.select_sql();
            let truncations = select.matches("DATE_TRUNC(").count();
            let utc_truncations = select.matches("AT TIME ZONE 'UTC')").count();
            assert_eq!(
                truncations,
                utc_truncations,
                "{} must bucket block timestamps in UTC",
                aggregation.name()
            );
        }
    }

    #[test]
    fn test_zero_count_for_empty_window() {
        let window = Periodicity::Daily.window_containing(1_615_984_496);
        let rows = zero_count_for_window(vec![], Some(&window));

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get(0),
            Some(&SqlValue::Date(NaiveDate::from_ymd_opt(2021, 3, 17).unwrap()))
        );
        assert_eq!(rows[0].get(1), Some(&SqlValue::Int(0)));
    }

    #[test]
    fn test_zero_count_skipped_for_full_history() {
        assert!(zero_count_for_window(vec![], None).is_empty());
    }
}
