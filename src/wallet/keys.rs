use std::fmt;

use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use serde_json::json;
use sha2::{Digest, Sha256};

use super::{SignedTransfer, Wallet};
use crate::blockchain::{AddressTransaction, Blockchain};
use crate::error::WalletError;

/// secp256k1 key pair bound to a chain for balance and history lookups.
pub struct KeyWallet {
    secret: SecretKey,
    public: PublicKey,
    address: String,
    chain: Blockchain,
}

impl KeyWallet {
    /// Generate a fresh key pair.
    pub fn generate(chain: Blockchain) -> Self {
        let secp = Secp256k1::new(); // context with All capabilities
        let (secret, public) = secp.generate_keypair(&mut OsRng);
        Self::from_keys(secret, public, chain)
    }

    /// Rebuild a wallet from a hex-encoded 32-byte secret key.
    pub fn from_secret_hex(secret_hex: &str, chain: Blockchain) -> Result<Self, WalletError> {
        let bytes = hex::decode(secret_hex.trim()).map_err(|_| WalletError::InvalidHex)?;
        let secret =
            SecretKey::from_slice(&bytes).map_err(|e| WalletError::InvalidKey(e.to_string()))?;
        let public = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret);
        Ok(Self::from_keys(secret, public, chain))
    }

    fn from_keys(secret: SecretKey, public: PublicKey, chain: Blockchain) -> Self {
        Self {
            address: address_from_public_key(&public),
            secret,
            public,
            chain,
        }
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret.secret_bytes())
    }

    /// Compressed (33 bytes) public key as hex.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public.serialize())
    }
}

impl fmt::Debug for KeyWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Wallet for KeyWallet {
    fn address(&self) -> &str {
        &self.address
    }

    fn balance(&self) -> i128 {
        self.chain.get_balance(&self.address)
    }

    fn history(&self) -> Vec<AddressTransaction> {
        self.chain.get_address_transactions(&self.address)
    }

    fn sign_transfer(&self, recipient: &str, amount: u64) -> SignedTransfer {
        let secp = Secp256k1::signing_only();
        let msg = Message::from_digest(transfer_digest(&self.address, recipient, amount));
        let signature = secp.sign_ecdsa(&msg, &self.secret);
        SignedTransfer {
            sender: self.address.clone(),
            recipient: recipient.to_string(),
            amount,
            signature: hex::encode(&*signature.serialize_der()),
        }
    }
}

/// First 40 hex chars of SHA-256(SHA-256(compressed public key)).
pub fn address_from_public_key(public: &PublicKey) -> String {
    let first = Sha256::digest(public.serialize());
    let second = Sha256::digest(first);
    let mut address = hex::encode(second);
    address.truncate(40);
    address
}

/// SHA-256 of the sorted-key JSON {amount, recipient, sender}: what a wallet signs.
pub fn transfer_digest(sender: &str, recipient: &str, amount: u64) -> [u8; 32] {
    let payload = json!({
        "sender": sender,
        "recipient": recipient,
        "amount": amount,
    });
    let digest = Sha256::digest(payload.to_string().as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

/// Check a signed transfer against a hex compressed public key.
///
/// The lifecycle manager does not call this; acceptance only requires a
/// signature to be present.
pub fn verify_transfer(public_key_hex: &str, transfer: &SignedTransfer) -> Result<bool, WalletError> {
    let secp = Secp256k1::verification_only();

    let pk_bytes = hex::decode(public_key_hex).map_err(|_| WalletError::InvalidHex)?;
    let public =
        PublicKey::from_slice(&pk_bytes).map_err(|e| WalletError::InvalidKey(e.to_string()))?;
    let sig_bytes = hex::decode(&transfer.signature).map_err(|_| WalletError::InvalidHex)?;
    let Ok(signature) = Signature::from_der(&sig_bytes) else {
        return Ok(false);
    };

    let msg = Message::from_digest(transfer_digest(
        &transfer.sender,
        &transfer.recipient,
        transfer.amount,
    ));
    Ok(secp.verify_ecdsa(&msg, &signature, &public).is_ok())
}
