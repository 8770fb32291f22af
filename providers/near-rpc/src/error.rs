//! Error types for contract code fetching

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP client could not be built
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network failure, non-2xx status, malformed body or generic RPC error
    #[error("Transient RPC failure: {0}")]
    Transient(String),

    /// No terminal answer within the attempt bound
    #[error(
        "Could not download contract code for {account_id} at block {block_id} \
         after {attempts} attempts: {last_error}"
    )]
    RetryExhausted {
        account_id: String,
        block_id: String,
        attempts: u32,
        last_error: String,
    },
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}
