use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};

use super::model::{Transaction, TxStatus};
use super::pool::TransactionPool;
use crate::blockchain::Blockchain;
use crate::config::ReconcileRule;
use crate::error::LedgerError;
use crate::wallet::WalletRegistry;

/// Drives transfers through create -> verify -> submit -> reconcile.
///
/// Keeps its own history of every transaction it has seen, independent of
/// what is currently pooled or pending on the chain.
pub struct TransactionManager {
    chain: Blockchain,
    wallets: Arc<dyn WalletRegistry>,
    pool: TransactionPool,
    history: HashMap<String, Transaction>,
    reconcile_rule: ReconcileRule,
}

impl TransactionManager {
    pub fn new(
        chain: Blockchain,
        wallets: Arc<dyn WalletRegistry>,
        reconcile_rule: ReconcileRule,
    ) -> Self {
        Self {
            chain,
            wallets,
            pool: TransactionPool::new(),
            history: HashMap::new(),
            reconcile_rule,
        }
    }

    /// Create a signed transfer from a registered wallet and pool it.
    pub fn create_transaction(
        &mut self,
        sender: &str,
        recipient: &str,
        amount: u64,
    ) -> Result<Transaction, LedgerError> {
        let wallet = self
            .wallets
            .resolve(sender)
            .ok_or_else(|| LedgerError::WalletNotFound(sender.to_string()))?;

        let available = self.chain.get_balance(sender);
        if available < i128::from(amount) {
            warn!("TX - {sender} cannot send {amount}: balance {available}");
            return Err(LedgerError::InsufficientFunds {
                available,
                required: amount,
            });
        }

        let signed = wallet.sign_transfer(recipient, amount);
        let tx = Transaction::new(
            signed.sender,
            signed.recipient,
            signed.amount,
            Some(signed.signature),
        );
        Ok(self.record(tx))
    }

    /// Pool an unsigned credit from the system address.
    pub fn create_system_transaction(&mut self, recipient: &str, amount: u64) -> Transaction {
        self.record(Transaction::system(recipient, amount))
    }

    fn record(&mut self, tx: Transaction) -> Transaction {
        if !self.pool.add(tx.clone()) {
            warn!(
                "TX - id collision for {} -> {} ({}): txid={} already pooled",
                tx.sender, tx.recipient, tx.amount, tx.transaction_id
            );
        }
        self.history.insert(tx.transaction_id.clone(), tx.clone());
        debug!("TX - created txid={}", tx.transaction_id);
        tx
    }

    /// System transfers always pass; anything else passes if it carries a
    /// signature. The signature itself is not checked against any key.
    pub fn verify_transaction(&self, tx: &Transaction) -> bool {
        if tx.is_system() {
            return true;
        }
        tx.signature.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Move a pooled transaction onto the chain's pending list.
    ///
    /// On success the transaction is marked `confirmed` right away, before the
    /// block containing it is mined. A transaction failing verification is
    /// marked `rejected` and stays in the pool.
    pub fn submit_transaction_to_blockchain(&mut self, id: &str) -> bool {
        let Some(tx) = self.pool.get(id) else {
            debug!("TX - submit of unknown txid={id}");
            return false;
        };

        if !self.verify_transaction(tx) {
            warn!("TX - txid={id} rejected: missing signature");
            self.set_status(id, TxStatus::Rejected);
            return false;
        }

        let Some(mut tx) = self.pool.remove(id) else {
            return false;
        };
        tx.status = TxStatus::Confirmed;
        let expected = self.chain.enqueue_transaction(tx.clone());
        info!("TX - txid={id} submitted, expected in block #{expected}");
        self.history.insert(tx.transaction_id.clone(), tx);
        true
    }

    /// Submit every pooled transaction. Returns how many went through.
    pub fn submit_all_pending_transactions(&mut self) -> usize {
        self.pool
            .ids()
            .iter()
            .filter(|id| self.submit_transaction_to_blockchain(id))
            .count()
    }

    /// Fill in `block_index` for confirmed history entries now found in a
    /// mined block. Returns the number of entries updated.
    pub fn update_transaction_statuses(&mut self) -> usize {
        let blocks = self.chain.blocks();
        let rule = self.reconcile_rule;
        let mut updated = 0;

        for tx in self
            .history
            .values_mut()
            .filter(|tx| tx.status == TxStatus::Confirmed && tx.block_index.is_none())
        {
            let found = blocks
                .iter()
                .find(|block| {
                    block.transactions.iter().any(|mined| match rule {
                        ReconcileRule::FieldTuple => mined.same_transfer(tx),
                        ReconcileRule::TransactionId => mined.transaction_id == tx.transaction_id,
                    })
                })
                .map(|block| block.index);

            if let Some(index) = found {
                tx.block_index = Some(index);
                updated += 1;
            }
        }

        if updated > 0 {
            info!("TX - reconciled {updated} transaction(s) against mined blocks");
        }
        updated
    }

    fn set_status(&mut self, id: &str, status: TxStatus) {
        if let Some(tx) = self.pool.get_mut(id) {
            tx.status = status;
        }
        if let Some(tx) = self.history.get_mut(id) {
            tx.status = status;
        }
    }

    /// Look in the pool first, then in the history.
    pub fn get_transaction(&self, id: &str) -> Option<&Transaction> {
        self.pool.get(id).or_else(|| self.history.get(id))
    }

    pub fn get_pending_transactions(&self) -> Vec<Transaction> {
        self.pool.all()
    }

    /// Every transaction ever created here, optionally only those touching
    /// `address`, oldest first.
    pub fn get_transaction_history(&self, address: Option<&str>) -> Vec<Transaction> {
        let mut txs: Vec<Transaction> = self
            .history
            .values()
            .filter(|tx| address.is_none_or(|a| tx.involves(a)))
            .cloned()
            .collect();
        txs.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
        });
        txs
    }

    pub fn pool_count(&self) -> usize {
        self.pool.count()
    }
}
