//! JSON-RPC envelopes and block payloads
//!
//! Only the fields the scanner reads are modelled; unknown fields are ignored.

use super::RpcError;
use num_bigint::BigUint;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const METHOD_BLOCK_NUMBER: &str = "eth_blockNumber";
pub const METHOD_GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: Option<Vec<serde_json::Value>>,
    pub id: String,
}

impl JsonRpcRequest {
    pub fn block_number(id: &str) -> Self {
        Self {
            jsonrpc: "2.0",
            method: METHOD_BLOCK_NUMBER,
            params: None,
            id: id.to_string(),
        }
    }

    /// Full block request, transactions included as objects.
    pub fn block_by_number(number: u64, id: &str) -> Self {
        Self {
            jsonrpc: "2.0",
            method: METHOD_GET_BLOCK_BY_NUMBER,
            params: Some(vec![
                serde_json::Value::String(to_hex_quantity(number)),
                serde_json::Value::Bool(true),
            ]),
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcTransaction {
    #[serde(default)]
    pub hash: Option<String>,
    pub from: String,
    /// `None` for contract creation
    #[serde(default)]
    pub to: Option<String>,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
    #[serde(default)]
    transactions: Option<Vec<RpcTransaction>>,
}

/// Transactions of one block as returned by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTransactions {
    pub number: u64,
    pub transactions: Vec<RpcTransaction>,
}

/// Decode a JSON-RPC response body.
///
/// `Ok(None)` means the endpoint answered without a result; an empty body is
/// reported as `RpcError::EmptyResponse`.
pub fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, RpcError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(RpcError::EmptyResponse);
    }

    let envelope: JsonRpcResponse<T> =
        serde_json::from_slice(body).map_err(|e| RpcError::Decode(e.to_string()))?;

    if let Some(error) = envelope.error {
        return Err(RpcError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    Ok(envelope.result)
}

/// Decode an `eth_blockNumber` response body into a height.
pub fn decode_latest_height(body: &[u8]) -> Result<u64, RpcError> {
    let result: String = decode_envelope(body)?.ok_or(RpcError::EmptyResponse)?;
    parse_hex_u64(&result)
}

/// Decode an `eth_getBlockByNumber` response body.
///
/// A `null` block or a block without a `transactions` field is not yet
/// available on the node and is reported as `RpcError::EmptyResponse`.
pub fn decode_block(number: u64, body: &[u8]) -> Result<BlockTransactions, RpcError> {
    let block: RpcBlock = decode_envelope(body)?.ok_or(RpcError::EmptyResponse)?;
    let transactions = block.transactions.ok_or(RpcError::EmptyResponse)?;
    Ok(BlockTransactions {
        number,
        transactions,
    })
}

pub fn to_hex_quantity(number: u64) -> String {
    format!("{:#x}", number)
}

fn hex_digits(raw: &str) -> Result<&str, RpcError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| RpcError::Decode(format!("hex quantity without 0x prefix: '{}'", raw)))?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(RpcError::Decode(format!("malformed hex quantity: '{}'", raw)));
    }
    Ok(digits)
}

/// Parse a `0x`-prefixed hex quantity of any size.
pub fn parse_hex_quantity(raw: &str) -> Result<BigUint, RpcError> {
    let digits = hex_digits(raw)?;
    BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| RpcError::Decode(format!("malformed hex quantity: '{}'", raw)))
}

pub fn parse_hex_u64(raw: &str) -> Result<u64, RpcError> {
    let digits = hex_digits(raw)?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Decode(format!("hex quantity '{}' out of range: {}", raw, e)))
}
