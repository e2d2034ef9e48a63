//! Per-block fetch workers
//!
//! Each worker fetches one block with bounded retries, extracts balance
//! deltas and pushes them onto the shared event channel in extraction order.

use crate::error::{FetchTarget, ScanError};
use crate::extractor::{extract_balance_deltas, BalanceDelta};
use crate::retry::{ExponentialBackoff, RetryPolicy};
use crate::rpc::{RpcClient, RpcError};
use std::future::Future;
use tokio::sync::mpsc;

/// Result of a successful call plus the number of calls it took.
#[derive(Debug)]
pub struct Fetched<T> {
    pub value: T,
    pub attempts: u32,
}

/// What one worker contributed to the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub block: u64,
    pub attempts: u32,
    pub transactions: usize,
    pub events: usize,
}

/// Run `call` until it succeeds, fails fatally, or the attempt budget is spent.
///
/// Only `RpcError::is_retryable` errors are retried.
pub async fn fetch_with_retry<T, F, Fut>(
    target: FetchTarget,
    policy: &RetryPolicy,
    mut call: F,
) -> Result<Fetched<T>, ScanError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RpcError>>,
{
    let mut backoff = ExponentialBackoff::new(policy.clone());

    loop {
        backoff.record_attempt();
        match call().await {
            Ok(value) => {
                return Ok(Fetched {
                    value,
                    attempts: backoff.attempts(),
                })
            }
            Err(e) if e.is_retryable() => {
                log::warn!(
                    "⚠️  {} attempt {}/{} failed: {}",
                    target,
                    backoff.attempts(),
                    policy.max_attempts,
                    e
                );
                if let Err(exceeded) = backoff.sleep().await {
                    return Err(ScanError::RetriesExhausted {
                        target,
                        attempts: exceeded.attempts,
                        last: e,
                    });
                }
            }
            Err(e) => return Err(ScanError::Fetch { target, source: e }),
        }
    }
}

/// Chain head, fetched with the same retry policy as blocks.
pub async fn fetch_latest_height(
    client: &dyn RpcClient,
    policy: &RetryPolicy,
) -> Result<u64, ScanError> {
    let fetched = fetch_with_retry(FetchTarget::LatestHeight, policy, || client.latest_height())
        .await?;
    Ok(fetched.value)
}

/// Fetch one block and forward its balance deltas to the aggregator.
pub async fn run_fetch_worker(
    client: &dyn RpcClient,
    block: u64,
    policy: &RetryPolicy,
    events: mpsc::Sender<BalanceDelta>,
) -> Result<WorkerOutcome, ScanError> {
    let fetched =
        fetch_with_retry(FetchTarget::Block(block), policy, || client.get_block(block)).await?;
    let transactions = fetched.value.transactions.len();

    let deltas = extract_balance_deltas(&fetched.value)?;
    let event_count = deltas.len();

    for delta in deltas {
        events
            .send(delta)
            .await
            .map_err(|_| ScanError::EventStreamClosed { block })?;
    }

    log::debug!(
        "📦 Block {}: {} txs, {} deltas ({} attempts)",
        block,
        transactions,
        event_count,
        fetched.attempts
    );

    Ok(WorkerOutcome {
        block,
        attempts: fetched.attempts,
        transactions,
        events: event_count,
    })
}
