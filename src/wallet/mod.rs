pub mod keys;
pub mod registry;

use std::sync::Arc;

use serde::Serialize;

use crate::blockchain::AddressTransaction;

pub use keys::KeyWallet;
pub use registry::WalletManager;

/// A transfer signed by its sender's wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransfer {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    /// Hex-encoded DER ECDSA signature
    pub signature: String,
}

/// Key holder able to sign transfers on behalf of one address.
pub trait Wallet: Send + Sync {
    fn address(&self) -> &str;

    /// Current balance of this wallet's address, pending transfers included.
    fn balance(&self) -> i128;

    fn history(&self) -> Vec<AddressTransaction>;

    fn sign_transfer(&self, recipient: &str, amount: u64) -> SignedTransfer;
}

/// Lookup of wallets by address.
pub trait WalletRegistry: Send + Sync {
    fn resolve(&self, address: &str) -> Option<Arc<dyn Wallet>>;
}
