//! Scan orchestration
//!
//! latest height -> block window -> one fetch worker per block -> event
//! channel -> balance aggregator -> extremal scan -> report.
//!
//! The first fatal worker error aborts every other worker and the run.

use crate::aggregator::{balance_aggregator_task, BalanceLedger};
use crate::config::{ScanSettings, MAX_EVENT_BUFFER};
use crate::error::ScanError;
use crate::extractor::BalanceDelta;
use crate::fetcher::{fetch_latest_height, run_fetch_worker, WorkerOutcome};
use crate::rpc::RpcClient;
use crate::scanner::{find_max_abs_delta, WalletDelta};
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use num_traits::Zero;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// Outcome of one scan run
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Configured window size
    pub window: u64,
    pub latest_height: u64,
    /// Lowest block scanned
    pub first_block: u64,
    pub blocks_scanned: u64,
    pub transactions_seen: u64,
    /// Deltas sent by workers; always equal to `events_applied` on success
    pub events_emitted: u64,
    pub events_applied: u64,
    pub wallets_touched: usize,
    pub fetch_attempts: u64,
    /// Sum of every ledger balance. Each transfer debits and credits the same
    /// amount, so anything but zero means deltas were lost or duplicated.
    #[serde(serialize_with = "serialize_signed_decimal")]
    pub net_total: BigInt,
    /// `None` when no block carried a non-zero-value transaction
    pub winner: Option<WalletDelta>,
    pub generated_at: DateTime<Utc>,
}

impl std::fmt::Display for ScanReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.winner {
            Some(winner) => write!(
                f,
                "For the last {} blocks wallet with max balance diff - {}; diff value - {} wei",
                self.window, winner.address, winner.magnitude
            ),
            None => write!(
                f,
                "For the last {} blocks no qualifying wallet found",
                self.window
            ),
        }
    }
}

fn serialize_signed_decimal<S: Serializer>(
    value: &BigInt,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_str_radix(10))
}

/// Block numbers to scan, newest first.
///
/// Stops at genesis when the chain is shorter than the window.
pub fn block_window(latest: u64, window: u64) -> Vec<u64> {
    let count = window.min(latest.saturating_add(1));
    (0..count).map(|offset| latest - offset).collect()
}

/// Run one full scan against `client`.
pub async fn run_scan(
    client: Arc<dyn RpcClient>,
    settings: &ScanSettings,
) -> Result<ScanReport, ScanError> {
    let latest_height = fetch_latest_height(client.as_ref(), &settings.retry).await?;
    let blocks = block_window(latest_height, settings.window);
    let first_block = blocks.last().copied().unwrap_or(latest_height);

    log::info!(
        "🔍 Scanning {} blocks ({}..={})",
        blocks.len(),
        first_block,
        latest_height
    );

    // tokio panics above MAX_EVENT_BUFFER
    let capacity = settings.event_buffer.clamp(1, MAX_EVENT_BUFFER);
    let (tx, rx) = mpsc::channel::<BalanceDelta>(capacity);
    let aggregator = tokio::spawn(balance_aggregator_task(rx));

    // Every worker is spawned before any is awaited
    let mut workers = JoinSet::new();
    for block in blocks.iter().copied() {
        let client = Arc::clone(&client);
        let events = tx.clone();
        let policy = settings.retry.clone();
        workers.spawn(async move { run_fetch_worker(client.as_ref(), block, &policy, events).await });
    }
    // Channel closes once the last worker drops its sender
    drop(tx);

    let mut transactions_seen = 0u64;
    let mut events_emitted = 0u64;
    let mut fetch_attempts = 0u64;
    let mut completed = 0usize;

    while let Some(joined) = workers.join_next().await {
        let outcome = match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => return Err(abort_scan(&mut workers, &aggregator, e).await),
            Err(e) => {
                let e = ScanError::Worker(e.to_string());
                return Err(abort_scan(&mut workers, &aggregator, e).await);
            }
        };

        transactions_seen += outcome.transactions as u64;
        events_emitted += outcome.events as u64;
        fetch_attempts += u64::from(outcome.attempts);
        completed += 1;
        if completed % 25 == 0 {
            log::info!("📊 Fetched {}/{} blocks", completed, blocks.len());
        }
    }

    let ledger = aggregator
        .await
        .map_err(|e| ScanError::Aggregator(e.to_string()))?;

    if ledger.events_applied() != events_emitted {
        return Err(ScanError::Aggregator(format!(
            "applied {} of {} emitted deltas",
            ledger.events_applied(),
            events_emitted
        )));
    }
    let net_total = ledger.net_total();
    if !net_total.is_zero() {
        return Err(ScanError::Aggregator(format!(
            "ledger does not balance, net total {}",
            net_total
        )));
    }

    let winner = find_max_abs_delta(&ledger);
    match &winner {
        Some(w) => log::info!("🏆 Max balance diff: {} ({} wei)", w.address, w.magnitude),
        None => log::info!("No non-zero value transfers in window"),
    }

    Ok(ScanReport {
        window: settings.window,
        latest_height,
        first_block,
        blocks_scanned: blocks.len() as u64,
        transactions_seen,
        events_emitted,
        events_applied: ledger.events_applied(),
        wallets_touched: ledger.len(),
        fetch_attempts,
        net_total,
        winner,
        generated_at: Utc::now(),
    })
}

/// Cancel remaining workers and the aggregator, waiting for the workers to stop.
async fn abort_scan(
    workers: &mut JoinSet<Result<WorkerOutcome, ScanError>>,
    aggregator: &JoinHandle<BalanceLedger>,
    error: ScanError,
) -> ScanError {
    log::error!("❌ Aborting scan: {}", error);
    workers.abort_all();
    while workers.join_next().await.is_some() {}
    aggregator.abort();
    error
}
