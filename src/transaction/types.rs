/// Transaction types for Sealchain
use crate::crypto::{sha256, KeyPair, Sha256Hash};
use crate::error::ChainError;
use fixed::types::I32F32;
use sha2::{Digest, Sha256};

/// Fixed-point value unit. Signed so that a negative amount can be rejected
/// explicitly rather than wrapping.
pub type Amount = I32F32;

const TX_DOMAIN: &[u8] = b"sealchain/tx/v1";

/// Fixed encoding: domain tag, then `from` and `to` as u32-LE length plus
/// UTF-8 bytes, then the amount's 8-byte little-endian bit pattern.
fn canonical_encoding(from: &str, to: &str, amount: Amount) -> Vec<u8> {
    let from = from.as_bytes();
    let to = to.as_bytes();

    let mut message = Vec::with_capacity(TX_DOMAIN.len() + 16 + from.len() + to.len());
    message.extend_from_slice(TX_DOMAIN);
    message.extend_from_slice(&(from.len() as u32).to_le_bytes());
    message.extend_from_slice(from);
    message.extend_from_slice(&(to.len() as u32).to_le_bytes());
    message.extend_from_slice(to);
    message.extend_from_slice(&amount.to_le_bytes());
    message
}

/// A value transfer recorded in a block
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Transaction {
    /// Miner reward or genesis issuance; has no sender and is never signed.
    Reward(RewardTx),
    Transfer(TransferTx),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RewardTx {
    pub to: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransferTx {
    /// Hex-encoded compressed public key of the sender
    pub from: String,
    pub to: String,
    pub amount: Amount,
    pub signature: Option<Vec<u8>>,
}

impl Transaction {
    pub fn reward(to: impl Into<String>, amount: Amount) -> Self {
        Transaction::Reward(RewardTx {
            to: to.into(),
            amount,
        })
    }

    pub fn transfer(from: impl Into<String>, to: impl Into<String>, amount: Amount) -> Self {
        Transaction::Transfer(TransferTx::new(from, to, amount))
    }

    pub fn is_reward(&self) -> bool {
        matches!(self, Transaction::Reward(_))
    }

    /// Sender identifier; empty for rewards.
    pub fn from(&self) -> &str {
        match self {
            Transaction::Reward(_) => "",
            Transaction::Transfer(tx) => &tx.from,
        }
    }

    pub fn to(&self) -> &str {
        match self {
            Transaction::Reward(tx) => &tx.to,
            Transaction::Transfer(tx) => &tx.to,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Transaction::Reward(tx) => tx.amount,
            Transaction::Transfer(tx) => tx.amount,
        }
    }

    pub fn signature(&self) -> Option<&[u8]> {
        match self {
            Transaction::Reward(_) => None,
            Transaction::Transfer(tx) => tx.signature.as_deref(),
        }
    }

    /// Hash of the economic fields `{from, to, amount}`. This is the digest
    /// that signatures cover; the signature itself is not part of it.
    pub fn compute_hash(&self) -> Sha256Hash {
        sha256(&self.canonical_bytes())
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.compute_hash())
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_encoding(self.from(), self.to(), self.amount())
    }

    /// Hash committing to the whole transaction, signature included. Used as
    /// the per-transaction input to a block's aggregate root.
    pub fn leaf_hash(&self) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.compute_hash());
        match self.signature() {
            Some(signature) => {
                hasher.update([1u8]);
                hasher.update((signature.len() as u32).to_le_bytes());
                hasher.update(signature);
            }
            None => hasher.update([0u8]),
        }
        hasher.finalize().into()
    }

    /// Signs the transaction with the sender's key. Rewards cannot be signed.
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<Vec<u8>, ChainError> {
        match self {
            Transaction::Reward(_) => Err(ChainError::InvalidOperation(
                "Reward transactions are never signed".to_string(),
            )),
            Transaction::Transfer(tx) => tx.sign(keypair),
        }
    }
}

impl TransferTx {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: Amount) -> Self {
        TransferTx {
            from: from.into(),
            to: to.into(),
            amount,
            signature: None,
        }
    }

    /// Same digest as [`Transaction::compute_hash`] for the wrapped transfer.
    pub fn compute_hash(&self) -> Sha256Hash {
        sha256(&canonical_encoding(&self.from, &self.to, self.amount))
    }

    pub fn sign(&mut self, keypair: &KeyPair) -> Result<Vec<u8>, ChainError> {
        if self.signature.is_some() {
            return Err(ChainError::AlreadySigned);
        }
        if self.amount < Amount::ZERO {
            return Err(ChainError::InvalidOperation(
                "Transfer amount cannot be negative".to_string(),
            ));
        }
        if keypair.public_key_hex() != self.from {
            return Err(ChainError::InvalidOperation(
                "Signing key does not belong to the sender".to_string(),
            ));
        }

        let digest = self.compute_hash();
        let signature = keypair.sign_digest(&digest).to_vec();
        self.signature = Some(signature.clone());
        Ok(signature)
    }
}
