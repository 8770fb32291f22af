use super::Aggregation;

pub struct DailyReceiptsPerContractCount;

impl Aggregation for DailyReceiptsPerContractCount {
    fn name(&self) -> &str {
        "daily_receipts_per_contract_count"
    }

    fn computable_in_one_pass(&self) -> bool {
        false
    }

    fn create_table_sql(&self) -> &str {
        r#"
            CREATE TABLE IF NOT EXISTS daily_receipts_per_contract_count
            (
                collected_for_day DATE   NOT NULL,
                contract_id       TEXT   NOT NULL,
                receipts_count    BIGINT NOT NULL,
                CONSTRAINT daily_receipts_per_contract_count_pk PRIMARY KEY (collected_for_day, contract_id)
            );
            CREATE INDEX IF NOT EXISTS daily_receipts_per_contract_count_idx
                ON daily_receipts_per_contract_count (collected_for_day, receipts_count DESC);
        "#
    }

    fn select_sql(&self) -> &str {
        r#"
            SELECT
                DATE_TRUNC('day', TO_TIMESTAMP(receipt_included_in_block_timestamp / 1000000000) AT TIME ZONE 'UTC')::date AS collected_for_day,
                receipt_receiver_account_id AS contract_id,
                COUNT(DISTINCT receipt_id) AS receipts_count
            FROM action_receipt_actions
            WHERE action_kind = 'FUNCTION_CALL'
                AND receipt_included_in_block_timestamp >= $1::bigint
                AND receipt_included_in_block_timestamp < $2::bigint
            GROUP BY collected_for_day, contract_id
        "#
    }

    fn insert_sql(&self) -> &str {
        r#"
            INSERT INTO daily_receipts_per_contract_count (collected_for_day, contract_id, receipts_count)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
        "#
    }
}
