use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::Block;
use super::mining::{self, MiningHandle, MiningStatus, StatusCallback};
use crate::config::ChainConfig;
use crate::error::{IntegrityError, MiningError, RecordError};
use crate::transaction::Transaction;

/// A transfer touching some address, tagged with where it currently lives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    /// Index of the containing block; `None` while pending.
    pub block: Option<u64>,
    pub confirmed: bool,
}

/// Serializable image of the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub pending_transactions: Vec<Transaction>,
    pub difficulty: u32,
    pub mining_reward: u64,
}

pub(super) struct ChainState {
    pub(super) chain: Vec<Block>,
    pub(super) pending: Vec<Transaction>,
    pub(super) difficulty: u32,
    pub(super) mining_reward: u64,
}

impl ChainState {
    pub(super) fn last_block(&self) -> &Block {
        // `Blockchain` never holds an empty chain: construction pushes genesis
        // and snapshots without blocks are refused.
        &self.chain[self.chain.len() - 1]
    }
}

pub(super) struct Shared {
    pub(super) state: Mutex<ChainState>,
    pub(super) mining_in_progress: AtomicBool,
    /// Cancel flag of the most recently started cycle.
    pub(super) cancel: Mutex<Arc<AtomicBool>>,
    pub(super) status: watch::Sender<MiningStatus>,
    pub(super) progress_tick: Duration,
    pub(super) carry_over_pending: bool,
}

impl Shared {
    /// Replace the status snapshot and notify the optional callback.
    pub(super) fn publish(&self, status: MiningStatus, callback: Option<&StatusCallback>) {
        debug!(
            "MINER - status {:?} ({}%) block={:?}",
            status.status, status.progress, status.block_index
        );
        self.status.send_replace(status.clone());
        if let Some(cb) = callback {
            cb(&status);
        }
    }
}

/// In-memory Proof-of-Work chain.
///
/// Cheap to clone: clones share the same blocks, pending list and miner.
#[derive(Clone)]
pub struct Blockchain {
    shared: Arc<Shared>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new(&ChainConfig::default())
    }
}

impl Blockchain {
    /// Initialize a new chain with a genesis block.
    pub fn new(config: &ChainConfig) -> Self {
        Self::from_parts(vec![Block::genesis()], Vec::new(), config)
    }

    fn from_parts(chain: Vec<Block>, pending: Vec<Transaction>, config: &ChainConfig) -> Self {
        let (status, _) = watch::channel(MiningStatus::idle());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ChainState {
                    chain,
                    pending,
                    difficulty: config.difficulty,
                    mining_reward: config.mining_reward,
                }),
                mining_in_progress: AtomicBool::new(false),
                cancel: Mutex::new(Arc::new(AtomicBool::new(false))),
                status,
                progress_tick: config.progress_tick,
                carry_over_pending: config.carry_over_pending,
            }),
        }
    }

    /// Restore a chain from a snapshot. Stored hashes are trusted.
    pub fn from_snapshot(snapshot: ChainSnapshot, config: &ChainConfig) -> Result<Self, RecordError> {
        if snapshot.chain.is_empty() {
            return Err(RecordError::EmptyChain);
        }
        let config = ChainConfig {
            difficulty: snapshot.difficulty,
            mining_reward: snapshot.mining_reward,
            ..config.clone()
        };
        Ok(Self::from_parts(
            snapshot.chain,
            snapshot.pending_transactions,
            &config,
        ))
    }

    pub fn from_json(json: &str, config: &ChainConfig) -> Result<Self, RecordError> {
        let snapshot: ChainSnapshot = serde_json::from_str(json)?;
        Self::from_snapshot(snapshot, config)
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        let state = self.shared.state.lock();
        ChainSnapshot {
            chain: state.chain.clone(),
            pending_transactions: state.pending.clone(),
            difficulty: state.difficulty,
            mining_reward: state.mining_reward,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Return the last block in the chain.
    pub fn get_latest_block(&self) -> Block {
        self.shared.state.lock().last_block().clone()
    }

    /// Queue a transfer for the next block. No validation happens here.
    ///
    /// Returns the index the transfer is expected to land in. This is advisory:
    /// a mining cycle already in flight resets the pending list when it ends.
    pub fn add_transaction(
        &self,
        sender: &str,
        recipient: &str,
        amount: u64,
        signature: Option<String>,
    ) -> u64 {
        self.enqueue_transaction(Transaction::new(sender, recipient, amount, signature))
    }

    /// Queue an existing transaction entity, keeping its id and timestamp.
    pub fn enqueue_transaction(&self, tx: Transaction) -> u64 {
        let mut state = self.shared.state.lock();
        let expected = state.last_block().index + 1;
        debug!(
            "CHAIN - queued {} -> {} ({}) txid={} for block #{}",
            tx.sender, tx.recipient, tx.amount, tx.transaction_id, expected
        );
        state.pending.push(tx);
        expected
    }

    /// Start mining the pending transfers in the background.
    ///
    /// Returns `false` without queuing anything if a cycle is already running.
    /// `callback` runs on the mining threads for every status update.
    pub fn mine_pending_transactions(
        &self,
        reward_address: &str,
        callback: Option<StatusCallback>,
    ) -> bool {
        match mining::start(&self.shared, reward_address, callback) {
            Ok(_handle) => true,
            Err(MiningError::AlreadyInProgress) => {
                debug!("MINER - request for {reward_address} rejected: already mining");
                false
            }
            Err(e) => {
                warn!("MINER - could not start: {e}");
                false
            }
        }
    }

    /// Like `mine_pending_transactions`, returning a handle to the cycle.
    pub fn start_mining(&self, reward_address: &str) -> Result<MiningHandle, MiningError> {
        mining::start(&self.shared, reward_address, None)
    }

    pub fn start_mining_with(
        &self,
        reward_address: &str,
        callback: StatusCallback,
    ) -> Result<MiningHandle, MiningError> {
        mining::start(&self.shared, reward_address, Some(callback))
    }

    pub fn is_mining(&self) -> bool {
        self.shared.mining_in_progress.load(Ordering::Acquire)
    }

    /// Ask the running cycle to stop, for callers of the boolean
    /// `mine_pending_transactions` that hold no handle. Returns `false` when
    /// nothing is being mined.
    pub fn cancel_mining(&self) -> bool {
        if !self.is_mining() {
            return false;
        }
        self.shared.cancel.lock().store(true, Ordering::Relaxed);
        true
    }

    /// Current mining status snapshot. Safe to poll during a cycle.
    ///
    /// `completed` is published just before the in-progress flag is cleared,
    /// so a new mining request sent the instant `completed` is observed can
    /// still be refused as already running. Check `is_mining()` or retry.
    pub fn get_mining_status(&self) -> MiningStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe_mining_status(&self) -> watch::Receiver<MiningStatus> {
        self.shared.status.subscribe()
    }

    /// Received minus sent, over every block and the pending list.
    pub fn get_balance(&self, address: &str) -> i128 {
        let state = self.shared.state.lock();
        let mined: i128 = state
            .chain
            .iter()
            .flat_map(|b| b.transactions.iter())
            .map(|tx| tx.delta_for(address))
            .sum();
        let pending: i128 = state.pending.iter().map(|tx| tx.delta_for(address)).sum();
        mined + pending
    }

    /// Every transfer involving `address`: mined ones first, then pending.
    pub fn get_address_transactions(&self, address: &str) -> Vec<AddressTransaction> {
        let state = self.shared.state.lock();
        let mut found = Vec::new();
        for block in &state.chain {
            for tx in block.transactions.iter().filter(|tx| tx.involves(address)) {
                found.push(AddressTransaction {
                    transaction: tx.clone(),
                    block: Some(block.index),
                    confirmed: true,
                });
            }
        }
        for tx in state.pending.iter().filter(|tx| tx.involves(address)) {
            found.push(AddressTransaction {
                transaction: tx.clone(),
                block: None,
                confirmed: false,
            });
        }
        found
    }

    /// Structural integrity: every non-genesis block's hash matches its
    /// contents and links to its predecessor. Difficulty and signatures are
    /// not checked.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        let state = self.shared.state.lock();
        for pair in state.chain.windows(2) {
            let (prev, current) = (&pair[0], &pair[1]);
            if !current.has_consistent_hash() {
                return Err(IntegrityError::HashMismatch {
                    index: current.index,
                });
            }
            if current.previous_hash != prev.hash {
                return Err(IntegrityError::BrokenLink {
                    index: current.index,
                });
            }
        }
        Ok(())
    }

    pub fn is_chain_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(e) => {
                info!("CHAIN - integrity check failed: {e}");
                false
            }
        }
    }

    pub fn get_chain_length(&self) -> usize {
        self.shared.state.lock().chain.len()
    }

    pub fn get_block(&self, index: u64) -> Option<Block> {
        let state = self.shared.state.lock();
        usize::try_from(index)
            .ok()
            .and_then(|i| state.chain.get(i))
            .cloned()
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.shared.state.lock().chain.clone()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.shared.state.lock().pending.clone()
    }

    pub fn difficulty(&self) -> u32 {
        self.shared.state.lock().difficulty
    }

    pub fn set_difficulty(&self, difficulty: u32) {
        // NOTE: Changing difficulty affects future blocks only.
        self.shared.state.lock().difficulty = difficulty;
    }

    pub fn mining_reward(&self) -> u64 {
        self.shared.state.lock().mining_reward
    }
}
