//! Net balance change scanner for Ethereum-style JSON-RPC endpoints
//!
//! Fetches the latest N blocks concurrently, folds every value transfer into a
//! per-address ledger and reports the address whose balance moved the most.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod pipeline;
pub mod retry;
pub mod rpc;
pub mod scanner;

pub use aggregator::BalanceLedger;
pub use config::{Config, ConfigError, OutputFormat, ScanSettings};
pub use error::{FetchTarget, ScanError};
pub use extractor::BalanceDelta;
pub use pipeline::{run_scan, ScanReport};
pub use rpc::{HttpRpcClient, RpcClient, RpcError};
pub use scanner::WalletDelta;
