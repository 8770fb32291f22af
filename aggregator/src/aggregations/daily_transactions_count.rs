use analytics_common::{ComputedRow, ExecutionWindow};

use super::{zero_count_for_window, Aggregation};

pub struct DailyTransactionsCount;

impl Aggregation for DailyTransactionsCount {
    fn name(&self) -> &str {
        "daily_transactions_count"
    }

    fn create_table_sql(&self) -> &str {
        r#"
            CREATE TABLE IF NOT EXISTS daily_transactions_count
            (
                collected_for_day         DATE   PRIMARY KEY,
                transactions_count_by_day BIGINT NOT NULL
            );
        "#
    }

    fn select_sql(&self) -> &str {
        r#"
            SELECT
                DATE_TRUNC('day', TO_TIMESTAMP(block_timestamp / 1000000000) AT TIME ZONE 'UTC')::date AS collected_for_day,
                COUNT(*) AS transactions_count_by_day
            FROM transactions
            WHERE block_timestamp >= $1::bigint
                AND block_timestamp < $2::bigint
            GROUP BY collected_for_day
            ORDER BY collected_for_day
        "#
    }

    fn insert_sql(&self) -> &str {
        r#"
            INSERT INTO daily_transactions_count (collected_for_day, transactions_count_by_day)
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
