//! NEAR RPC Provider
//!
//! Fetches deployed contract binaries from a NEAR JSON-RPC endpoint for the
//! contract classification step of the aggregator.
//!
//! Features:
//! - `query` / `view_code` at a historical block
//! - Bounded retries with a fixed pause between attempts
//! - `UNKNOWN_ACCOUNT` treated as a terminal answer, never retried
//! - Retry exhaustion reported as an error, never as empty code

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod error;
pub mod fetcher;
pub mod jsonrpc;

pub use error::FetchError;
pub use fetcher::ContractCodeFetcher;
pub use jsonrpc::{RpcError, RpcRequest, RpcResponse, ViewCodeResult, UNKNOWN_ACCOUNT};

/// Fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    pub rpc_url: String,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://archival-rpc.mainnet.near.org".to_string(),
            timeout_seconds: 30,
            max_attempts: 1000,
            retry_delay_ms: 250,
            user_agent: "near-aggregator/0.1".to_string(),
        }
    }
}

impl FetcherConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            ..Default::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Outcome of a code lookup that reached a terminal answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeLookup {
    Code(Vec<u8>),
    AccountNotFound,
}

impl CodeLookup {
    /// Deployed bytes; a missing account has no code
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            CodeLookup::Code(code) => code,
            CodeLookup::AccountNotFound => Vec::new(),
        }
    }
}

/// Anything that can return a contract's code at a block
#[async_trait]
pub trait ContractCodeSource: Send + Sync {
    async fn fetch_code(&self, account_id: &str, block_id: &str)
        -> Result<CodeLookup, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = FetcherConfig::default();
        assert_eq!(config.max_attempts, 1000);
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.retry_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_account_not_found_has_no_code() {
        assert!(CodeLookup::AccountNotFound.into_bytes().is_empty());
        assert_eq!(CodeLookup::Code(vec![0, 97]).into_bytes(), vec![0, 97]);
    }
}
