use analytics_common::{ComputedRow, ExecutionWindow};

use super::{zero_count_for_window, Aggregation};
use crate::session::Database;

pub struct DailyNewUniqueContractsCount;

impl Aggregation for DailyNewUniqueContractsCount {
    fn name(&self) -> &str {
        "daily_new_unique_contracts_count"
    }

    fn dependencies(&self) -> &[&'static str] {
        &["unique_contracts"]
    }

    // Each day depends on every earlier day of unique_contracts
    fn computable_in_one_pass(&self) -> bool {
        false
    }

    fn source(&self) -> Database {
        Database::Analytics
    }

    fn create_table_sql(&self) -> &str {
        r#"
            CREATE TABLE IF NOT EXISTS daily_new_unique_contracts_count
            (
                collected_for_day    DATE   PRIMARY KEY,
                new_contracts_count  BIGINT NOT NULL
            );
        "#
    }

    fn select_sql(&self) -> &str {
        r#"
            SELECT
                DATE_TRUNC('day', TO_TIMESTAMP(first_deployed_at_block_timestamp / 1000000000) AT TIME ZONE 'UTC')::date AS collected_for_day,
                COUNT(*) AS new_contracts_count
            FROM unique_contracts
            WHERE first_deployed_at_block_timestamp >= $1::bigint
                AND first_deployed_at_block_timestamp < $2::bigint
            GROUP BY collected_for_day
            ORDER BY collected_for_day
        "#
    }

    fn insert_sql(&self) -> &str {
        r#"
            INSERT INTO daily_new_unique_contracts_count (collected_for_day, new_contracts_count)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
        "#
    }

    fn prepare_rows(
        &self,
        rows: Vec<ComputedRow>,
        window: Option<&ExecutionWindow>,
    ) -> Vec<ComputedRow> {
        zero_count_for_window(rows, window)
    }
}
