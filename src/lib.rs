//! Sealchain - an append-only ledger of proof-of-work sealed blocks
//!
//! # Architecture
//!
//! ## Core Ledger
//! - [`transaction`] - Reward and transfer transactions, hashing and signing
//! - [`blockchain`] - Blocks, the chain with its pending pool, and auditing
//!
//! ## Consensus
//! - [`miner`] - Proof-of-work sealing search (cancellable, parallel)
//!
//! ## Cryptography
//! - [`crypto`] - SHA-256 digests and secp256k1 signatures
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```no_run
//! use sealchain::blockchain::Blockchain;
//! use sealchain::crypto::KeyPair;
//! use sealchain::transaction::{Amount, Transaction};
//!
//! # fn main() -> Result<(), sealchain::error::ChainError> {
//! let alice = KeyPair::generate();
//! let bob = KeyPair::generate();
//! let mut chain = Blockchain::new()?;
//!
//! let mut tx = Transaction::transfer(alice.public_key_hex(), bob.public_key_hex(), Amount::from_num(10));
//! tx.sign(&alice)?;
//! chain.submit_transaction(tx)?;
//!
//! chain.mine_now(&alice.public_key_hex())?;
//! chain.validate_chain()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
