use crate::error::ScanError;
use crate::rpc::types::parse_hex_quantity;
use crate::rpc::BlockTransactions;
use num_bigint::{BigInt, Sign};
use num_traits::Zero;

/// Recipient credited for contract-creation transactions (`to` is null).
pub const CONTRACT_CREATION_RECIPIENT: &str = "contract-creation";

/// Signed balance change for one side of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDelta {
    pub address: String,
    pub delta: BigInt,
}

/// Turn a block's transactions into balance deltas.
///
/// Emits `(from, -value)` then `(to, +value)` per non-zero-value transaction,
/// in transaction order. Any malformed value rejects the whole block.
pub fn extract_balance_deltas(block: &BlockTransactions) -> Result<Vec<BalanceDelta>, ScanError> {
    let mut deltas = Vec::with_capacity(block.transactions.len() * 2);

    for (tx_index, tx) in block.transactions.iter().enumerate() {
        let value = parse_hex_quantity(&tx.value).map_err(|_| ScanError::MalformedValue {
            block: block.number,
            tx_index,
            value: tx.value.clone(),
        })?;

        if value.is_zero() {
            continue;
        }

        let recipient = tx
            .to
            .clone()
            .unwrap_or_else(|| CONTRACT_CREATION_RECIPIENT.to_string());

        deltas.push(BalanceDelta {
            address: tx.from.clone(),
            delta: BigInt::from_biguint(Sign::Minus, value.clone()),
        });
        deltas.push(BalanceDelta {
            address: recipient,
            delta: BigInt::from_biguint(Sign::Plus, value),
        });
    }

    Ok(deltas)
}
