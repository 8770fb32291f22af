use super::Aggregation;

pub struct DailyTransactionsPerAccountCount;

impl Aggregation for DailyTransactionsPerAccountCount {
    fn name(&self) -> &str {
        "daily_transactions_per_account_count"
    }

    // Millions of (day, account) rows over all history
    fn computable_in_one_pass(&self) -> bool {
        false
    }

    fn create_table_sql(&self) -> &str {
        r#"
            CREATE TABLE IF NOT EXISTS daily_transactions_per_account_count
            (
                collected_for_day  DATE   NOT NULL,
                account_id         TEXT   NOT NULL,
                transactions_count BIGINT NOT NULL,
                CONSTRAINT daily_transactions_per_account_count_pk PRIMARY KEY (collected_for_day, account_id)
            );
            CREATE INDEX IF NOT EXISTS daily_transactions_per_account_count_idx
                ON daily_transactions_per_account_count (collected_for_day, transactions_count DESC);
        "#
    }

    fn select_sql(&self) -> &str {
        r#"
            SELECT
                DATE_TRUNC('day', TO_TIMESTAMP(block_timestamp / 1000000000) AT TIME ZONE 'UTC')::date AS collected_for_day,
                signer_account_id AS account_id,
                COUNT(*) AS transactions_count
            FROM transactions
            WHERE block_timestamp >= $1::bigint
                AND block_timestamp < $2::bigint
            GROUP BY collected_for_day, signer_account_id
        "#
    }

    fn insert_sql(&self) -> &str {
        r#"
            INSERT INTO daily_transactions_per_account_count (collected_for_day, account_id, transactions_count)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
        "#
    }
}
