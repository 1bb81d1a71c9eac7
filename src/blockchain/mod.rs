pub mod block;
pub mod mining;
pub mod model;

pub use block::Block;
pub use mining::{MiningHandle, MiningState, MiningStatus, StatusCallback};
pub use model::{AddressTransaction, Blockchain, ChainSnapshot};

/// Default Proof-of-Work difficulty (number of leading zero hex digits).
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Amount credited to the miner for every sealed block.
pub const MINING_REWARD: u64 = 10;

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Interval of the cosmetic progress reporter.
pub const PROGRESS_TICK_MS: u64 = 200;

/// Progress never exceeds this value until the search completes.
pub const PROGRESS_CAP: u8 = 90;
