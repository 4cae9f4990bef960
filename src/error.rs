//! Error types for Sealchain

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// A transaction failed verification. `index` is its position in a block
    /// body when the failure was found while building or auditing a block.
    #[error("Invalid transaction{}: {reason}", .index.map(|i| format!(" at index {}", i)).unwrap_or_default())]
    InvalidTransaction { index: Option<usize>, reason: String },
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Transaction is already signed")]
    AlreadySigned,
    #[error("Tampered block: {0}")]
    TamperedBlock(String),
    #[error("Chain invalid: {0}")]
    ChainInvalid(String),
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl ChainError {
    pub fn invalid_transaction(reason: impl Into<String>) -> Self {
        ChainError::InvalidTransaction {
            index: None,
            reason: reason.into(),
        }
    }

    /// Attach a body position to an `InvalidTransaction`; other kinds pass through.
    pub fn at_index(self, index: usize) -> Self {
        match self {
            ChainError::InvalidTransaction { reason, .. } => ChainError::InvalidTransaction {
                index: Some(index),
                reason,
            },
            other => other,
        }
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transaction_display() {
        let err = ChainError::invalid_transaction("Transfer not signed");
        assert_eq!(err.to_string(), "Invalid transaction: Transfer not signed");

        let err = err.at_index(3);
        assert_eq!(
            err.to_string(),
            "Invalid transaction at index 3: Transfer not signed"
        );
    }

    #[test]
    fn test_at_index_leaves_other_kinds_alone() {
        assert_eq!(ChainError::AlreadySigned.at_index(1), ChainError::AlreadySigned);
    }
}
