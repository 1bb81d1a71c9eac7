use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::blockchain::{Block, Blockchain};
use crate::config::{AppConfig, ChainConfig, ReconcileRule};
use crate::transaction::{Transaction, TransactionManager};
use crate::wallet::WalletManager;

/// Shared application state: the chain service, the wallet registry and the
/// transaction lifecycle manager.
pub struct AppState {
    pub blockchain: Blockchain,
    pub wallets: Arc<WalletManager>,
    pub transactions: Mutex<TransactionManager>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        Self::build(&config.chain, config.reconcile_rule)
    }

    pub fn build(chain: &ChainConfig, reconcile_rule: ReconcileRule) -> Self {
        let blockchain = Blockchain::new(chain);
        let wallets = Arc::new(WalletManager::new(blockchain.clone()));
        let transactions =
            TransactionManager::new(blockchain.clone(), wallets.clone(), reconcile_rule);
        Self {
            blockchain,
            wallets,
            transactions: Mutex::new(transactions),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse {
    pub length: usize,
    pub difficulty: u32,
    pub pending_transactions: Vec<Transaction>,
    pub chain: Vec<Block>,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub difficulty: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct DifficultyResponse {
    pub difficulty: u32,
}

#[derive(Deserialize)]
pub struct SetDifficultyRequest {
    pub difficulty: u32,
}

/* ---------- Mining API Models ---------- */

#[derive(Deserialize)]
pub struct MineRequest {
    pub miner_address: String,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub started: bool,
    pub block_index: u64,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct NewTxRequest {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

#[derive(Deserialize)]
pub struct FaucetRequest {
    pub address: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct TxResponse {
    pub transaction: Transaction,
    pub submitted: bool,
}

#[derive(Serialize)]
pub struct TransactionsResponse {
    pub pending: Vec<Transaction>,
    pub history: Vec<Transaction>,
}

#[derive(Serialize)]
pub struct SubmitAllResponse {
    pub submitted: usize,
}

/* ---------- Wallet / balance API Models ---------- */

#[derive(Serialize)]
pub struct NewWalletResponse {
    pub private_key: String,
    pub public_key: String,
    pub address: String,
}

#[derive(Serialize)]
pub struct WalletSummary {
    pub address: String,
    pub balance: i128,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: i128,
}

#[derive(Serialize)]
pub struct BalancesResponse {
    pub balances: BTreeMap<String, i128>,
    pub total: i128,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub height: usize,
    pub difficulty: u32,
    pub mining_reward: u64,
    pub is_valid: bool,
    pub pending_transactions: usize,
    pub pool_size: usize,
    pub last_interval_secs: Option<i64>,
    pub mining: bool,
}
