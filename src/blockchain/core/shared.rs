use crate::blockchain::core::block::Block;
use crate::blockchain::core::chain::Blockchain;
use crate::error::ChainError;
use crate::miner::{Miner, SealOutcome};
use crate::transaction::{Amount, Transaction};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::debug;

/// Thread-safe handle over a [`Blockchain`].
///
/// Readers (`validate_chain`, `balance_of`, `len`) run concurrently. Mining
/// is serialized by a writer mutex; the sealing search itself runs without
/// holding the chain lock, so submissions and audits proceed while a block
/// is being sealed. Transactions submitted during a search stay in the pool
/// for the next block.
#[derive(Clone)]
pub struct SharedChain {
    chain: Arc<RwLock<Blockchain>>,
    writer: Arc<Mutex<()>>,
}

impl SharedChain {
    pub fn new(chain: Blockchain) -> Self {
        SharedChain {
            chain: Arc::new(RwLock::new(chain)),
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn submit_transaction(&self, tx: Transaction) -> Result<(), ChainError> {
        self.chain.write().submit_transaction(tx)
    }

    pub fn mine_now(
        &self,
        miner: &Miner,
        reward_address: &str,
    ) -> Result<SealOutcome<Block>, ChainError> {
        let _writer = self.writer.lock();

        let (previous_hash, body, drained, difficulty) = {
            let chain = self.chain.read();
            (
                chain.tail_hash(),
                chain.candidate_body(reward_address),
                chain.pending_transactions().len(),
                chain.difficulty(),
            )
        };
        debug!(drained, difficulty, "Sealing pool snapshot");

        match Block::mine(previous_hash, body, difficulty, miner)? {
            SealOutcome::Sealed(block) => {
                self.chain.write().commit(block.clone(), drained)?;
                Ok(SealOutcome::Sealed(block))
            }
            SealOutcome::Cancelled => Ok(SealOutcome::Cancelled),
        }
    }

    pub fn validate_chain(&self) -> Result<(), ChainError> {
        self.chain.read().validate_chain()
    }

    pub fn len(&self) -> usize {
        self.chain.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.read().is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.chain.read().pending_transactions().len()
    }

    pub fn balance_of(&self, address: &str) -> Amount {
        self.chain.read().balance_of(address)
    }

    /// Runs `f` against the chain under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Blockchain) -> R) -> R {
        f(&self.chain.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn test_submission_during_mining_is_kept() {
        let shared = SharedChain::new(Blockchain::with_params(1, Amount::from_num(50)).unwrap());
        let alice = KeyPair::generate();

        let mut first = Transaction::transfer(alice.public_key_hex(), "bob", Amount::from_num(1));
        first.sign(&alice).unwrap();
        shared.submit_transaction(first).unwrap();

        // Simulate a submission racing with the search by snapshotting first.
        let snapshot = shared.read(|c| c.pending_transactions().len());
        let mut second = Transaction::transfer(alice.public_key_hex(), "carol", Amount::from_num(2));
        second.sign(&alice).unwrap();

        let block = {
            let _writer = shared.writer.lock();
            let (prev, body, difficulty) =
                shared.read(|c| (c.tail_hash(), c.candidate_body("m"), c.difficulty()));
            shared.submit_transaction(second.clone()).unwrap();
            let block = Block::new(prev, body, difficulty).unwrap();
            shared.chain.write().commit(block.clone(), snapshot).unwrap();
            block
        };

        assert_eq!(block.transactions.len(), 2);
        assert_eq!(shared.len(), 2);
        assert_eq!(shared.read(|c| c.pending_transactions().to_vec()), vec![second]);
        assert!(shared.validate_chain().is_ok());
    }

    #[test]
    fn test_invalid_submission_rejected() {
        let shared = SharedChain::new(Blockchain::with_params(1, Amount::from_num(50)).unwrap());
        let unsigned = Transaction::transfer("someone", "bob", Amount::from_num(1));

        assert!(shared.submit_transaction(unsigned).is_err());
        assert_eq!(shared.pending_len(), 0);
    }
}
