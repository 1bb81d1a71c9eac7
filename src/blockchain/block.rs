use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use super::GENESIS_PREVIOUS_HASH;
use crate::error::{MiningError, RecordError};
use crate::transaction::{Transaction, TxStatus};

/// A single block in the chain holding a list of transfers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: i64, // Unix timestamp (UTC)
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub nonce: u64,   // Proof-of-Work nonce
    pub hash: String, // Cached hash of the block
}

impl Block {
    /// Create the genesis block (first block in the chain).
    pub fn genesis() -> Self {
        Self::new(0, GENESIS_PREVIOUS_HASH.to_string(), Vec::new())
    }

    /// Create a new block (not mined yet). Call `mine()` to perform PoW.
    pub fn new(index: u64, previous_hash: String, transactions: Vec<Transaction>) -> Self {
        Self::with_timestamp(index, Utc::now().timestamp(), previous_hash, transactions)
    }

    /// Like `new`, with a caller-chosen timestamp. Every transfer is stamped
    /// as confirmed in this block; the stamp is not covered by the hash.
    pub fn with_timestamp(
        index: u64,
        timestamp: i64,
        previous_hash: String,
        transactions: Vec<Transaction>,
    ) -> Self {
        let transactions = transactions
            .into_iter()
            .map(|mut tx| {
                tx.status = TxStatus::Confirmed;
                tx.block_index = Some(index);
                tx
            })
            .collect();
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// SHA-256 over the sorted-key JSON of
    /// {index, nonce, previous_hash, timestamp, transactions}.
    pub fn compute_hash(&self) -> String {
        let entries: Vec<Value> = self.transactions.iter().map(Transaction::ledger_entry).collect();
        let preimage = json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "transactions": entries,
            "previous_hash": self.previous_hash,
            "nonce": self.nonce,
        });
        let mut hasher = Sha256::new();
        hasher.update(preimage.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether the cached hash starts with `difficulty` zero hex digits.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        self.hash.len() >= difficulty as usize
            && self.hash.chars().take(difficulty as usize).all(|c| c == '0')
    }

    /// Whether the cached hash matches the block contents.
    pub fn has_consistent_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Perform Proof-of-Work: bump the nonce from its current value until the
    /// hash has `difficulty` leading zeros. Returns the wall-clock time spent.
    /// The nonce wraps around at `u64::MAX`; the search has no upper bound.
    pub fn mine(&mut self, difficulty: u32) -> Duration {
        let started = Instant::now();
        while !self.meets_difficulty(difficulty) {
            self.bump_nonce();
        }
        started.elapsed()
    }

    /// Same search as `mine`, checking `cancel` before every attempt.
    pub fn mine_cancellable(
        &mut self,
        difficulty: u32,
        cancel: &AtomicBool,
    ) -> Result<Duration, MiningError> {
        let started = Instant::now();
        self.search(difficulty, cancel)?;
        Ok(started.elapsed())
    }

    fn search(&mut self, difficulty: u32, cancel: &AtomicBool) -> Result<(), MiningError> {
        while !self.meets_difficulty(difficulty) {
            if cancel.load(Ordering::Relaxed) {
                return Err(MiningError::Cancelled);
            }
            self.bump_nonce();
        }
        Ok(())
    }

    fn bump_nonce(&mut self) {
        self.nonce = self.nonce.wrapping_add(1);
        self.hash = self.compute_hash();
    }

    /// Canonical wire record {index, timestamp, transactions, previous_hash, nonce, hash}.
    pub fn to_record(&self) -> Value {
        json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "transactions": self.transactions,
            "previous_hash": self.previous_hash,
            "nonce": self.nonce,
            "hash": self.hash,
        })
    }

    /// Rebuild a block from its record. The stored nonce and hash are kept
    /// as-is; use `has_consistent_hash` to re-verify.
    pub fn from_record(record: Value) -> Result<Self, RecordError> {
        Ok(serde_json::from_value(record)?)
    }
}
