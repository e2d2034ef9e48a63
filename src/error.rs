use crate::config::ConfigError;
use crate::rpc::RpcError;

/// Which RPC call a fetch was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    LatestHeight,
    Block(u64),
}

impl std::fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchTarget::LatestHeight => write!(f, "latest block height"),
            FetchTarget::Block(number) => write!(f, "block {}", number),
        }
    }
}

/// Fatal errors for a scan run. Any of these aborts the whole window.
#[derive(Debug)]
pub enum ScanError {
    Config(ConfigError),
    /// HTTP client could not be constructed
    Client(RpcError),
    /// Non-retryable RPC failure
    Fetch { target: FetchTarget, source: RpcError },
    RetriesExhausted {
        target: FetchTarget,
        attempts: u32,
        last: RpcError,
    },
    MalformedValue {
        block: u64,
        tx_index: usize,
        value: String,
    },
    /// Aggregator went away while a worker was still sending
    EventStreamClosed { block: u64 },
    /// Worker task panicked or was cancelled
    Worker(String),
    Aggregator(String),
    /// Report could not be rendered
    Output(String),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::Config(e) => write!(f, "Configuration error: {}", e),
            ScanError::Client(e) => write!(f, "Failed to create RPC client: {}", e),
            ScanError::Fetch { target, source } => {
                write!(f, "Failed to fetch {}: {}", target, source)
            }
            ScanError::RetriesExhausted {
                target,
                attempts,
                last,
            } => write!(
                f,
                "Requests limit exceeded for {} after {} attempts (last error: {})",
                target, attempts, last
            ),
            ScanError::MalformedValue {
                block,
                tx_index,
                value,
            } => write!(
                f,
                "Malformed value '{}' in transaction {} of block {}",
                value, tx_index, block
            ),
            ScanError::EventStreamClosed { block } => {
                write!(f, "Event stream closed while sending deltas for block {}", block)
            }
            ScanError::Worker(msg) => write!(f, "Fetch worker failed: {}", msg),
            ScanError::Aggregator(msg) => write!(f, "Balance aggregator failed: {}", msg),
            ScanError::Output(msg) => write!(f, "Failed to render report: {}", msg),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScanError::Config(e) => Some(e),
            ScanError::Client(e) => Some(e),
            ScanError::Fetch { source, .. } => Some(source),
            ScanError::RetriesExhausted { last, .. } => Some(last),
            _ => None,
        }
    }
}

impl From<ConfigError> for ScanError {
    fn from(e: ConfigError) -> Self {
        ScanError::Config(e)
    }
}

impl ScanError {
    /// Block number the error is attributed to, if any.
    pub fn block(&self) -> Option<u64> {
        match self {
            ScanError::Fetch {
                target: FetchTarget::Block(n),
                ..
            }
            | ScanError::RetriesExhausted {
                target: FetchTarget::Block(n),
                ..
            } => Some(*n),
            ScanError::MalformedValue { block, .. } | ScanError::EventStreamClosed { block } => {
                Some(*block)
            }
            _ => None,
        }
    }
}
