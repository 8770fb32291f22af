use analytics_common::{ComputedRow, ExecutionWindow};

use super::{zero_count_for_window, Aggregation};

pub struct DailyActiveAccountsCount;

impl Aggregation for DailyActiveAccountsCount {
    fn name(&self) -> &str {
        "daily_active_accounts_count"
    }

    fn create_table_sql(&self) -> &str {
        r#"
            CREATE TABLE IF NOT EXISTS daily_active_accounts_count
            (
                collected_for_day    DATE   PRIMARY KEY,
                active_accounts_count BIGINT NOT NULL
            );
        "#
    }

    fn select_sql(&self) -> &str {
        r#"
            SELECT
                DATE_TRUNC('day', TO_TIMESTAMP(block_timestamp / 1000000000) AT TIME ZONE 'UTC')::date AS collected_for_day,
                COUNT(DISTINCT signer_account_id) AS active_accounts_count
            FROM transactions
            WHERE block_timestamp >= $1::bigint
                AND block_timestamp < $2::bigint
            GROUP BY collected_for_day
            ORDER BY collected_for_day
        "#
    }

    fn insert_sql(&self) -> &str {
        r#"
            INSERT INTO daily_active_accounts_count (collected_for_day, active_accounts_count)
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
