use super::Aggregation;

pub struct DailyGasUsed;

impl Aggregation for DailyGasUsed {
    fn name(&self) -> &str {
        "daily_gas_used"
    }

    fn create_table_sql(&self) -> &str {
        r#"
            CREATE TABLE IF NOT EXISTS daily_gas_used
            (
                collected_for_day DATE           PRIMARY KEY,
                gas_used          numeric(31, 0) NOT NULL
            );
        "#
    }

    // SUM over numeric overflows BIGINT, so it travels as text
    fn select_sql(&self) -> &str {
        r#"
            SELECT
                DATE_TRUNC('day', TO_TIMESTAMP(blocks.block_timestamp / 1000000000) AT TIME ZONE 'UTC')::date AS collected_for_day,
                SUM(chunks.gas_used)::text AS gas_used
            FROM blocks
            JOIN chunks ON chunks.included_in_block_hash = blocks.block_hash
            WHERE blocks.block_timestamp >= $1::bigint
                AND blocks.block_timestamp < $2::bigint
            GROUP BY collected_for_day
            ORDER BY collected_for_day
        "#
    }

    fn insert_sql(&self) -> &str {
        r#"
            INSERT INTO daily_gas_used (collected_for_day, gas_used)
            VALUES ($1, $2::text::numeric)
            ON CONFLICT DO NOTHING
        "#
    }
}
