use {
    crate::extractor::BalanceDelta,
    num_bigint::BigInt,
    num_traits::Zero,
    std::collections::HashMap,
    tokio::sync::mpsc,
};

/// Net balance change per address over the scanned window
///
/// Owned by the aggregator task; nothing else mutates it while the scan runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceLedger {
    balances: HashMap<String, BigInt>,
    events_applied: u64,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one delta to the address's running total.
    pub fn apply(&mut self, event: BalanceDelta) {
        match self.balances.get_mut(&event.address) {
            Some(balance) => *balance += event.delta,
            None => {
                self.balances.insert(event.address, event.delta);
            }
        }
        self.events_applied += 1;
    }

    pub fn get(&self, address: &str) -> Option<&BigInt> {
        self.balances.get(address)
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub fn events_applied(&self) -> u64 {
        self.events_applied
    }

    /// Iteration order is the map's and therefore unspecified.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BigInt)> {
        self.balances.iter()
    }

    /// Sum over all addresses. Zero for any closed set of transactions.
    pub fn net_total(&self) -> BigInt {
        self.balances
            .values()
            .fold(BigInt::zero(), |acc, balance| acc + balance)
    }
}

/// Drain the event channel into a ledger.
///
/// Returns once every sender is dropped and the channel is empty, which is
/// the signal that all fetch workers are done.
pub async fn balance_aggregator_task(mut receiver: mpsc::Receiver<BalanceDelta>) -> BalanceLedger {
    log::info!("Balance aggregator task started");

    let mut ledger = BalanceLedger::new();
    while let Some(event) = receiver.recv().await {
        ledger.apply(event);
    }

    let net_total = ledger.net_total();
    if net_total.is_zero() {
        log::debug!("Ledger balanced across {} addresses", ledger.len());
    } else {
        log::warn!("⚠️  Ledger net total is {} (expected 0)", net_total);
    }

    log::info!(
        "Balance aggregator task stopped: {} events, {} addresses",
        ledger.events_applied(),
        ledger.len()
    );
    ledger
}
