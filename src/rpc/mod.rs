//! JSON-RPC access to the chain
//!
//! The pipeline only talks to the `RpcClient` trait. `HttpRpcClient` is the
//! production implementation; tests provide their own.

pub mod http;
pub mod types;

pub use http::HttpRpcClient;
pub use types::{BlockTransactions, RpcTransaction};

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// Network failure, timeout, or a throttling/server status from the endpoint
    Transport(String),
    /// Body does not match the expected JSON-RPC shape
    Decode(String),
    /// Structurally valid but carries no usable result
    EmptyResponse,
    /// JSON-RPC error object returned by the node
    Rpc { code: i64, message: String },
    /// Non-retryable HTTP status
    Http { status: u16 },
    /// Client could not be built (bad header value, TLS backend)
    Setup(String),
}

impl RpcError {
    /// Transport failures and empty responses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RpcError::Transport(_) | RpcError::EmptyResponse)
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcError::Transport(msg) => write!(f, "Transport error: {}", msg),
            RpcError::Decode(msg) => write!(f, "Decode error: {}", msg),
            RpcError::EmptyResponse => write!(f, "Empty response from RPC endpoint"),
            RpcError::Rpc { code, message } => write!(f, "RPC error {}: {}", code, message),
            RpcError::Http { status } => write!(f, "HTTP status {}", status),
            RpcError::Setup(msg) => write!(f, "RPC client setup failed: {}", msg),
        }
    }
}

impl std::error::Error for RpcError {}

/// The two calls the scanner needs from a node.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Current chain head.
    async fn latest_height(&self) -> Result<u64, RpcError>;

    /// Block `number` with full transaction objects.
    async fn get_block(&self, number: u64) -> Result<BlockTransactions, RpcError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(RpcError::Transport("timeout".to_string()).is_retryable());
        assert!(RpcError::EmptyResponse.is_retryable());
        assert!(!RpcError::Decode("bad json".to_string()).is_retryable());
        assert!(!RpcError::Http { status: 401 }.is_retryable());
        assert!(!RpcError::Setup("invalid header".to_string()).is_retryable());
        assert!(!RpcError::Rpc {
            code: -32000,
            message: "header not found".to_string()
        }
        .is_retryable());
    }
}
