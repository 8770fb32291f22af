//! JSON-RPC envelope types for the NEAR `query` method

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Error cause name returned when the account does not exist at the block
pub const UNKNOWN_ACCOUNT: &str = "UNKNOWN_ACCOUNT";

/// RPC request structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    pub id: String,
}

impl RpcRequest {
    pub fn new(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: "dontcare".to_string(),
        }
    }

    /// `query` / `view_code` for an account at a block hash or height
    pub fn view_code(account_id: &str, block_id: &str) -> Self {
        Self::new(
            "query",
            json!({
                "request_type": "view_code",
                "account_id": account_id,
                "block_id": block_id,
            }),
        )
    }
}

/// RPC response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: Value,
}

/// RPC error structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<Value>,
    pub name: Option<String>,
    pub cause: Option<ErrorCause>,
}

/// Structured cause attached to NEAR handler errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorCause {
    pub name: String,
    pub info: Option<Value>,
}

impl RpcError {
    pub fn cause_name(&self) -> Option<&str> {
        self.cause.as_ref().map(|cause| cause.name.as_str())
    }

    pub fn is_unknown_account(&self) -> bool {
        self.cause_name() == Some(UNKNOWN_ACCOUNT)
    }
}

/// Successful `view_code` result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewCodeResult {
    pub code_base64: String,
    pub hash: Option<String>,
    pub block_height: Option<u64>,
    pub block_hash: Option<String>,
}
