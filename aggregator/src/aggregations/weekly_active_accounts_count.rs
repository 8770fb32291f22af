use analytics_common::Periodicity;

use super::Aggregation;

pub struct WeeklyActiveAccountsCount;

impl Aggregation for WeeklyActiveAccountsCount {
    fn name(&self) -> &str {
        "weekly_active_accounts_count"
    }

    fn periodicity(&self) -> Periodicity {
        Periodicity::Weekly
    }

    fn create_table_sql(&self) -> &str {
        r#"
            CREATE TABLE IF NOT EXISTS weekly_active_accounts_count
            (
                collected_for_week    DATE   PRIMARY KEY,
                active_accounts_count BIGINT NOT NULL
            );
        "#
    }

    // DATE_TRUNC('week') starts weeks on Monday, matching the window policy
    fn select_sql(&self) -> &str {
        r#"
            SELECT
                DATE_TRUNC('week', TO_TIMESTAMP(block_timestamp / 1000000000) AT TIME ZONE 'UTC')::date AS collected_for_week,
                COUNT(DISTINCT signer_account_id) AS active_accounts_count
            FROM transactions
            WHERE block_timestamp >= $1::bigint
                AND block_timestamp < $2::bigint
            GROUP BY collected_for_week
            ORDER BY collected_for_week
        "#
    }

    fn insert_sql(&self) -> &str {
        r#"
            INSERT INTO weekly_active_accounts_count (collected_for_week, active_accounts_count)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
        "#
    }
}
