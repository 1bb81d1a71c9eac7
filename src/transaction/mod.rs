pub mod manager;
pub mod model;
pub mod pool;

pub use manager::TransactionManager;
pub use model::{Transaction, TxStatus};
pub use pool::TransactionPool;

/// Sender of minted transfers (mining rewards, faucet credits).
pub const SYSTEM_ADDRESS: &str = "SYSTEM";
