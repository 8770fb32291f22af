use super::{Aggregation, Enrichment};
use crate::session::Database;

/// First deployment of every distinct contract code, with its SDK type
///
/// Rows are inserted with an empty `contract_sdk_type`; the classification
/// drainer fills it in after each store.
pub struct UniqueContracts;

impl Aggregation for UniqueContracts {
    fn name(&self) -> &str {
        "unique_contracts"
    }

    fn dependencies(&self) -> &[&'static str] {
        &["deployed_contracts"]
    }

    fn source(&self) -> Database {
        Database::Analytics
    }

    fn create_table_sql(&self) -> &str {
        r#"
            CREATE TABLE IF NOT EXISTS unique_contracts
            (
                contract_code_sha256              text           PRIMARY KEY,
                contract_sdk_type                 text           NOT NULL DEFAULT '',
                first_deployed_to_account_id      text           NOT NULL,
                first_deployed_by_receipt_id      text           NOT NULL,
                first_deployed_at_block_timestamp numeric(20, 0) NOT NULL,
                first_deployed_at_block_hash      text           NOT NULL
            );
            CREATE INDEX IF NOT EXISTS unique_contracts_contract_sdk_type_idx
                ON unique_contracts (contract_sdk_type);
            CREATE INDEX IF NOT EXISTS unique_contracts_timestamp_idx
                ON unique_contracts (first_deployed_at_block_timestamp);
            CREATE INDEX IF NOT EXISTS unique_contracts_first_deployed_to_account_id_idx
                ON unique_contracts (first_deployed_to_account_id);
        "#
    }

    // Earliest deployment per hash inside the window; later windows
    // repeating a hash are absorbed by ON CONFLICT DO NOTHING
    fn select_sql(&self) -> &str {
        r#"
            SELECT DISTINCT ON (contract_code_sha256)
                contract_code_sha256,
                deployed_to_account_id,
                deployed_by_receipt_id,
                deployed_at_block_timestamp::bigint AS deployed_at_block_timestamp,
                deployed_at_block_hash
            FROM deployed_contracts
            WHERE deployed_at_block_timestamp >= $1::bigint
                AND deployed_at_block_timestamp < $2::bigint
            ORDER BY contract_code_sha256, deployed_at_block_timestamp
        "#
    }

    fn insert_sql(&self) -> &str {
        r#"
            INSERT INTO unique_contracts (
                contract_code_sha256,
                first_deployed_to_account_id,
                first_deployed_by_receipt_id,
                first_deployed_at_block_timestamp,
                first_deployed_at_block_hash
            ) VALUES ($1, $2, $3, $4::bigint, $5)
            ON CONFLICT DO NOTHING
        "#
    }

    fn enrichment(&self) -> Option<Enrichment> {
        Some(Enrichment::ContractSdkTypes)
    }
}
