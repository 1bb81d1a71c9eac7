use std::collections::HashMap;

use super::model::Transaction;

/// Transfers created but not yet handed to the chain, keyed by transaction id.
/// Entries leave the pool on submission, not on confirmation.
#[derive(Debug, Default)]
pub struct TransactionPool {
    map: HashMap<String, Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Insert a transaction. Returns `false` if its id is already pooled.
    pub fn add(&mut self, tx: Transaction) -> bool {
        if self.map.contains_key(&tx.transaction_id) {
            return false;
        }
        self.map.insert(tx.transaction_id.clone(), tx);
        true
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.map.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Transaction> {
        self.map.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Transaction> {
        self.map.remove(id)
    }

    /// Unordered snapshot of every pooled transaction.
    pub fn all(&self) -> Vec<Transaction> {
        self.map.values().cloned().collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(amount: u64) -> Transaction {
        Transaction::with_timestamp("alice", "bob", amount, 1_700_000_000, Some("sig".into()))
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut pool = TransactionPool::new();
        assert!(pool.add(tx(1)));
        assert!(!pool.add(tx(1)));
        assert!(pool.add(tx(2)));
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn remove_returns_the_entry_once() {
        let mut pool = TransactionPool::new();
        let t = tx(3);
        let id = t.transaction_id.clone();
        pool.add(t.clone());

        assert_eq!(pool.get(&id), Some(&t));
        assert_eq!(pool.remove(&id), Some(t));
        assert!(pool.remove(&id).is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn clear_empties_the_pool() {
        let mut pool = TransactionPool::new();
        pool.add(tx(1));
        pool.add(tx(2));
        assert_eq!(pool.all().len(), 2);
        assert_eq!(pool.ids().len(), 2);
        pool.clear();
        assert_eq!(pool.count(), 0);
        assert!(pool.all().is_empty());
    }
}
