use super::Aggregation;

/// Every successful `DEPLOY_CONTRACT` action with its exact block
pub struct DeployedContracts;

impl Aggregation for DeployedContracts {
    fn name(&self) -> &str {
        "deployed_contracts"
    }

    // Several deployments can land on the same day, so the exact timestamp is kept
    fn create_table_sql(&self) -> &str {
        r#"
            CREATE TABLE IF NOT EXISTS deployed_contracts
            (
                contract_code_sha256        text           NOT NULL,
                deployed_to_account_id      text           NOT NULL,
                deployed_by_receipt_id      text           PRIMARY KEY,
                deployed_at_block_timestamp numeric(20, 0) NOT NULL
            );
            CREATE INDEX IF NOT EXISTS deployed_contracts_timestamp_idx
                ON deployed_contracts (deployed_at_block_timestamp);
            CREATE INDEX IF NOT EXISTS deployed_contracts_sha256_idx
                ON deployed_contracts (contract_code_sha256);
            CREATE INDEX IF NOT EXISTS deployed_contracts_deployed_to_account_id_idx
                ON deployed_contracts (deployed_to_account_id);
            ALTER TABLE deployed_contracts
                ADD COLUMN IF NOT EXISTS deployed_at_block_hash text NOT NULL DEFAULT '';
        "#
    }

    fn select_sql(&self) -> &str {
        r#"
            SELECT
                action_receipt_actions.args->>'code_sha256' AS contract_code_sha256,
                action_receipt_actions.receipt_receiver_account_id AS deployed_to_account_id,
                action_receipt_actions.receipt_id AS deployed_by_receipt_id,
                execution_outcomes.executed_in_block_timestamp::bigint AS deployed_at_block_timestamp,
                execution_outcomes.executed_in_block_hash AS deployed_at_block_hash
            FROM action_receipt_actions
            JOIN execution_outcomes ON execution_outcomes.receipt_id = action_receipt_actions.receipt_id
            WHERE action_receipt_actions.action_kind = 'DEPLOY_CONTRACT'
                AND execution_outcomes.status = 'SUCCESS_VALUE'
                AND execution_outcomes.executed_in_block_timestamp >= $1::bigint
                AND execution_outcomes.executed_in_block_timestamp < $2::bigint
            ORDER BY execution_outcomes.executed_in_block_timestamp
        "#
    }

    fn insert_sql(&self) -> &str {
        r#"
            INSERT INTO deployed_contracts (
                contract_code_sha256,
                deployed_to_account_id,
                deployed_by_receipt_id,
                deployed_at_block_timestamp,
                deployed_at_block_hash
            ) VALUES ($1, $2, $3, $4::bigint, $5)
            ON CONFLICT DO NOTHING
        "#
    }
}
