//! Extremal scan over the final ledger
//!
//! Ties on magnitude keep whichever address the map yields first, so the
//! winner among equal magnitudes is not deterministic across runs.

use crate::aggregator::BalanceLedger;
use num_bigint::BigUint;
use serde::{Serialize, Serializer};

/// Address with the largest absolute balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletDelta {
    pub address: String,
    #[serde(serialize_with = "serialize_decimal")]
    pub magnitude: BigUint,
}

/// Single pass over the ledger. `None` when the ledger is empty.
pub fn find_max_abs_delta(ledger: &BalanceLedger) -> Option<WalletDelta> {
    let mut best: Option<(&String, BigUint)> = None;

    for (address, balance) in ledger.iter() {
        let magnitude = balance.magnitude();
        let replace = match &best {
            Some((_, current)) => magnitude > current,
            None => true,
        };
        if replace {
            best = Some((address, magnitude.clone()));
        }
    }

    best.map(|(address, magnitude)| WalletDelta {
        address: address.clone(),
        magnitude,
    })
}

/// Big integers go out as decimal strings so JSON consumers keep full precision.
pub fn serialize_decimal<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_str_radix(10))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::BalanceDelta;
    use num_bigint::BigInt;

    fn ledger(entries: &[(&str, i64)]) -> BalanceLedger {
        let mut ledger = BalanceLedger::new();
        for (address, value) in entries {
            ledger.apply(BalanceDelta {
                address: address.to_string(),
                delta: BigInt::from(*value),
            });
        }
        ledger
    }

    #[test]
    fn test_empty_ledger_has_no_winner() {
        assert_eq!(find_max_abs_delta(&BalanceLedger::new()), None);
    }

    #[test]
    fn test_negative_balance_can_win() {
        let winner = find_max_abs_delta(&ledger(&[("0xAA", -40), ("0xBB", 25), ("0xCC", 15)]))
            .unwrap();
        assert_eq!(winner.address, "0xAA");
        assert_eq!(winner.magnitude, BigUint::from(40u32));
    }

    #[test]
    fn test_tie_reports_exact_magnitude() {
        let winner = find_max_abs_delta(&ledger(&[("0xAA", -16), ("0xBB", 16)])).unwrap();
        assert!(winner.address == "0xAA" || winner.address == "0xBB");
        assert_eq!(winner.magnitude, BigUint::from(16u32));
    }

    #[test]
    fn test_beyond_native_width() {
        let mut l = BalanceLedger::new();
        let huge = BigInt::from(u128::MAX) * BigInt::from(4);
        l.apply(BalanceDelta {
            address: "0xWHALE".to_string(),
            delta: huge.clone(),
        });
        l.apply(BalanceDelta {
            address: "0xSMALL".to_string(),
            delta: BigInt::from(1),
        });

        let winner = find_max_abs_delta(&l).unwrap();
        assert_eq!(winner.address, "0xWHALE");
        assert_eq!(winner.magnitude, huge.magnitude().clone());
    }

    #[test]
    fn test_magnitude_serializes_as_decimal_string() {
        let winner = WalletDelta {
            address: "0xAA".to_string(),
            magnitude: BigUint::from(16u32),
        };
        let json = serde_json::to_value(&winner).unwrap();
        assert_eq!(json, serde_json::json!({"address": "0xAA", "magnitude": "16"}));
    }
}
