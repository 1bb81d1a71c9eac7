//! Single-node Proof-of-Work ledger.
//!
//! - `blockchain`: blocks, the chain service and its background miner
//! - `transaction`: the transfer entity, the pool and the lifecycle manager
//! - `wallet`: secp256k1 wallets and the in-memory registry
//! - `api`: actix-web JSON routes over the above

pub mod api;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod transaction;
pub mod wallet;

pub use blockchain::{Block, Blockchain, MiningHandle, MiningState, MiningStatus};
pub use config::{AppConfig, ChainConfig, ReconcileRule};
pub use error::{IntegrityError, LedgerError, MiningError};
pub use transaction::{Transaction, TransactionManager, TransactionPool, TxStatus};
pub use wallet::{KeyWallet, Wallet, WalletManager, WalletRegistry};
