use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use parking_lot::RwLock;

use super::{KeyWallet, Wallet, WalletRegistry};
use crate::blockchain::Blockchain;
use crate::error::WalletError;

/// In-memory wallet registry keyed by address.
pub struct WalletManager {
    chain: Blockchain,
    wallets: RwLock<HashMap<String, Arc<KeyWallet>>>,
}

impl WalletManager {
    pub fn new(chain: Blockchain) -> Self {
        Self {
            chain,
            wallets: RwLock::new(HashMap::new()),
        }
    }

    pub fn create_wallet(&self) -> Arc<KeyWallet> {
        let wallet = Arc::new(KeyWallet::generate(self.chain.clone()));
        info!("WALLET - created {}", wallet.address());
        self.insert(wallet)
    }

    pub fn import_wallet(&self, secret_hex: &str) -> Result<Arc<KeyWallet>, WalletError> {
        let wallet = Arc::new(KeyWallet::from_secret_hex(secret_hex, self.chain.clone())?);
        info!("WALLET - imported {}", wallet.address());
        Ok(self.insert(wallet))
    }

    fn insert(&self, wallet: Arc<KeyWallet>) -> Arc<KeyWallet> {
        self.wallets
            .write()
            .insert(wallet.address().to_string(), Arc::clone(&wallet));
        wallet
    }

    pub fn get_wallet(&self, address: &str) -> Option<Arc<KeyWallet>> {
        self.wallets.read().get(address).cloned()
    }

    /// Known addresses, sorted.
    pub fn list_wallets(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.wallets.read().keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn get_total_balance(&self) -> i128 {
        self.wallets.read().values().map(|w| w.balance()).sum()
    }
}

impl WalletRegistry for WalletManager {
    fn resolve(&self, address: &str) -> Option<Arc<dyn Wallet>> {
        self.get_wallet(address).map(|w| w as Arc<dyn Wallet>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_wallets_resolve_by_address() {
        let manager = WalletManager::new(Blockchain::default());
        let alice = manager.create_wallet();
        let bob = manager.create_wallet();

        let resolved = manager.resolve(alice.address()).unwrap();
        assert_eq!(resolved.address(), alice.address());
        assert!(manager.resolve("nobody").is_none());

        let mut expected = vec![alice.address().to_string(), bob.address().to_string()];
        expected.sort();
        assert_eq!(manager.list_wallets(), expected);
    }

    #[test]
    fn import_registers_the_wallet() {
        let chain = Blockchain::default();
        let source = WalletManager::new(chain.clone());
        let original = source.create_wallet();

        let target = WalletManager::new(chain);
        let imported = target.import_wallet(&original.secret_key_hex()).unwrap();
        assert_eq!(imported.address(), original.address());
        assert!(target.get_wallet(original.address()).is_some());
        assert!(target.import_wallet("not-hex").is_err());
    }

    #[test]
    fn total_balance_sums_every_wallet() {
        let chain = Blockchain::default();
        let manager = WalletManager::new(chain.clone());
        let alice = manager.create_wallet();
        let bob = manager.create_wallet();
        chain.add_transaction("SYSTEM", alice.address(), 30, None);
        chain.add_transaction(alice.address(), bob.address(), 10, Some("sig".into()));
        chain.add_transaction("SYSTEM", "outsider", 99, None);

        assert_eq!(manager.get_total_balance(), 30);
    }
}
