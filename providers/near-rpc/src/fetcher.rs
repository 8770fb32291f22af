//! Contract code fetcher
//!
//! One `view_code` inquiry per attempt. Any transient failure is retried
//! after a fixed pause until `max_attempts` is reached; an `UNKNOWN_ACCOUNT`
//! error ends the lookup immediately with [`CodeLookup::AccountNotFound`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Client as HttpClient;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::jsonrpc::{RpcRequest, RpcResponse, ViewCodeResult};
use crate::{CodeLookup, ContractCodeSource, FetcherConfig};

pub struct ContractCodeFetcher {
    client: HttpClient,
    config: FetcherConfig,
}

impl ContractCodeFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        if config.max_attempts == 0 {
            return Err(FetchError::Configuration(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        let client = HttpClient::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Fetch code, retrying transient failures up to the attempt bound
    pub async fn fetch(&self, account_id: &str, block_id: &str) -> Result<CodeLookup, FetchError> {
        let request = RpcRequest::view_code(account_id, block_id);
        let mut last_error = None;
        let mut attempts = 0;

        while attempts < self.config.max_attempts {
            attempts += 1;

            debug!(
                "Attempt {}/{} - view_code for {} at block {}",
                attempts, self.config.max_attempts, account_id, block_id
            );

            match self.view_code(&request).await {
                Ok(lookup) => return Ok(lookup),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(
                        "Retrying fetching contract code for {} (attempt {}/{}): {}",
                        account_id, attempts, self.config.max_attempts, e
                    );
                    last_error = Some(e);

                    if attempts < self.config.max_attempts {
                        tokio::time::sleep(self.config.retry_delay()).await;
                    }
                }
            }
        }

        Err(FetchError::RetryExhausted {
            account_id: account_id.to_string(),
            block_id: block_id.to_string(),
            attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt made".to_string()),
        })
    }

    /// Make a single `view_code` request
    async fn view_code(&self, request: &RpcRequest) -> Result<CodeLookup, FetchError> {
        let response = self
            .client
            .post(&self.config.rpc_url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| FetchError::Transient(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let rpc_response: RpcResponse = match response.json().await {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Err(FetchError::Transient(format!(
                    "Failed to parse RPC response: {}",
                    e
                )))
            }
            Err(_) => {
                return Err(FetchError::Transient(format!(
                    "HTTP error: status {}",
                    status
                )))
            }
        };

        if let Some(error) = rpc_response.error {
            if error.is_unknown_account() {
                debug!("Account does not exist at the requested block");
                return Ok(CodeLookup::AccountNotFound);
            }
            return Err(FetchError::Transient(format!(
                "RPC error {}: {} {}",
                error.code,
                error.message,
                error.data.map(|d| d.to_string()).unwrap_or_default()
            )));
        }

        if !status.is_success() {
            return Err(FetchError::Transient(format!("HTTP error: status {}", status)));
        }

        let result = rpc_response
            .result
            .ok_or_else(|| FetchError::Transient("No result in RPC response".to_string()))?;

        let view: ViewCodeResult = serde_json::from_value(result)
            .map_err(|e| FetchError::Transient(format!("Unexpected view_code result: {}", e)))?;

        let code = STANDARD
            .decode(view.code_base64.as_bytes())
            .map_err(|e| FetchError::Transient(format!("Invalid code_base64: {}", e)))?;

        Ok(CodeLookup::Code(code))
    }
}

#[async_trait]
impl ContractCodeSource for ContractCodeFetcher {
    async fn fetch_code(
        &self,
        account_id: &str,
        block_id: &str,
    ) -> Result<CodeLookup, FetchError> {
        self.fetch(account_id, block_id).await
    }
}
