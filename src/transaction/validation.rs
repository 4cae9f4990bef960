/// Validation logic for transactions separated from type definitions
use crate::crypto::verify_digest;
use crate::error::ChainError;
use crate::transaction::types::{Amount, Transaction, TransferTx};

impl Transaction {
    /// Stateless verification. Rewards always pass; transfers must carry a
    /// non-negative amount and a signature by `from` over `compute_hash()`.
    pub fn verify(&self) -> Result<(), ChainError> {
        match self {
            Transaction::Reward(_) => Ok(()),
            Transaction::Transfer(tx) => tx.verify(),
        }
    }

    /// Query form of [`Transaction::verify`]. A missing signature, malformed
    /// key or failed verification all yield `false`.
    pub fn is_valid(&self) -> bool {
        self.verify().is_ok()
    }
}

impl TransferTx {
    pub fn verify(&self) -> Result<(), ChainError> {
        if self.amount < Amount::ZERO {
            return Err(ChainError::invalid_transaction(
                "Transfer amount cannot be negative",
            ));
        }
        let signature = self
            .signature
            .as_deref()
            .ok_or_else(|| ChainError::invalid_transaction("Transfer not signed"))?;

        verify_digest(&self.from, &self.compute_hash(), signature)
            .map_err(|e| ChainError::invalid_transaction(e.to_string()))
    }
}
