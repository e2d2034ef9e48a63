//! reqwest-backed JSON-RPC client
//!
//! Requests are POSTed as JSON with the API key in the `x-api-key` header.
//! Every request carries the configured timeout.

use super::types::{decode_block, decode_latest_height, JsonRpcRequest};
use super::{BlockTransactions, RpcClient, RpcError};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;

pub const API_KEY_HEADER: &str = "x-api-key";

pub struct HttpRpcClient {
    client: reqwest::Client,
    endpoint: String,
    request_id: String,
}

impl HttpRpcClient {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        timeout: Duration,
        request_id: &str,
    ) -> Result<Self, RpcError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| RpcError::Setup(format!("invalid API key header: {}", e)))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| RpcError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            request_id: request_id.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, RpcError> {
        Self::new(
            &config.api_endpoint,
            &config.api_key,
            config.rpc_timeout,
            &config.request_id,
        )
    }

    /// POST one request and return the raw response body.
    async fn call(&self, request: &JsonRpcRequest) -> Result<Vec<u8>, RpcError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(RpcError::Transport(format!("endpoint returned {}", status)));
        }
        if !status.is_success() {
            return Err(RpcError::Http {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    async fn latest_height(&self) -> Result<u64, RpcError> {
        let request = JsonRpcRequest::block_number(&self.request_id);
        let body = self.call(&request).await?;
        decode_latest_height(&body)
    }

    async fn get_block(&self, number: u64) -> Result<BlockTransactions, RpcError> {
        let request = JsonRpcRequest::block_by_number(number, &self.request_id);
        let body = self.call(&request).await?;
        decode_block(number, &body)
    }
}
