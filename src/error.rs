use thiserror::Error;

/// Failures surfaced by `TransactionManager::create_transaction`.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("sender wallet not found: {0}")]
    WalletNotFound(String),
    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: i128, required: u64 },
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("invalid secret key hex")]
    InvalidHex,
    #[error("invalid secret key: {0}")]
    InvalidKey(String),
}

/// Outcome of a mining cycle that did not seal a block.
#[derive(Debug, Error)]
pub enum MiningError {
    #[error("mining already in progress")]
    AlreadyInProgress,
    #[error("mining cancelled")]
    Cancelled,
    #[error("failed to spawn miner thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Why `Blockchain::validate` rejected the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("block #{index}: stored hash does not match its contents")]
    HashMismatch { index: u64 },
    #[error("block #{index}: previous_hash does not match the preceding block")]
    BrokenLink { index: u64 },
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("chain snapshot contains no blocks")]
    EmptyChain,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
