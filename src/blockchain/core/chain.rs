use crate::blockchain::core::block::Block;
use crate::blockchain::core::state::Balances;
use crate::blockchain::core::validation::validate_sequence;
use crate::config::ChainConfig;
use crate::crypto::{hash_to_hex, Sha256Hash, ZERO_HASH};
use crate::error::ChainError;
use crate::miner::{Miner, SealOutcome, MAX_DIFFICULTY};
use crate::transaction::{Amount, Transaction};
use tracing::{info, warn};

pub const DEFAULT_DIFFICULTY: u32 = 2;
pub const DEFAULT_MINER_REWARD: u64 = 50;

/// Single-writer chain of sealed blocks plus the pool of transactions
/// waiting for the next block.
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
    miner_reward: Amount,
    difficulty: u32,
}

impl Blockchain {
    /// Chain with difficulty 2 and a reward of 50; the genesis block is
    /// sealed immediately.
    pub fn new() -> Result<Self, ChainError> {
        Self::with_params(DEFAULT_DIFFICULTY, Amount::from_num(DEFAULT_MINER_REWARD))
    }

    pub fn with_config(config: &ChainConfig) -> Result<Self, ChainError> {
        let miner_reward = Amount::checked_from_num(config.miner_reward).ok_or_else(|| {
            ChainError::InvalidOperation(format!(
                "Miner reward {} is out of range",
                config.miner_reward
            ))
        })?;
        Self::with_params(config.difficulty, miner_reward)
    }

    pub fn with_params(difficulty: u32, miner_reward: Amount) -> Result<Self, ChainError> {
        if difficulty > MAX_DIFFICULTY {
            return Err(ChainError::InvalidOperation(format!(
                "Difficulty {} exceeds maximum {}",
                difficulty, MAX_DIFFICULTY
            )));
        }
        if miner_reward < Amount::ZERO {
            return Err(ChainError::InvalidOperation(
                "Miner reward cannot be negative".to_string(),
            ));
        }

        let genesis = Self::create_genesis_block(difficulty)?;
        info!(
            difficulty,
            hash = %genesis.hash_str(),
            "Genesis block created"
        );

        Ok(Blockchain {
            blocks: vec![genesis],
            pending: Vec::new(),
            miner_reward,
            difficulty,
        })
    }

    fn create_genesis_block(difficulty: u32) -> Result<Block, ChainError> {
        Block::new(
            ZERO_HASH,
            vec![Transaction::reward("", Amount::ZERO)],
            difficulty,
        )
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn latest_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn miner_reward(&self) -> Amount {
        self.miner_reward
    }

    pub(crate) fn tail_hash(&self) -> Sha256Hash {
        self.blocks.last().map_or(ZERO_HASH, |b| b.block_hash)
    }

    /// Admits a transaction to the pending pool. This is the only gate in
    /// front of block construction.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<(), ChainError> {
        if let Err(e) = tx.verify() {
            warn!(tx = %tx.hash_str(), error = %e, "Transaction rejected");
            return Err(e);
        }
        self.pending.push(tx);
        Ok(())
    }

    /// Pool plus the reward transaction, in block order.
    pub(crate) fn candidate_body(&self, reward_address: &str) -> Vec<Transaction> {
        let mut body = self.pending.clone();
        body.push(Transaction::reward(reward_address, self.miner_reward));
        body
    }

    /// Seals the pool plus a reward for `reward_address` into a new block and
    /// appends it. The pool is cleared only if the append succeeds.
    pub fn mine_now(&mut self, reward_address: &str) -> Result<Block, ChainError> {
        let body = self.candidate_body(reward_address);
        let block = Block::new(self.tail_hash(), body, self.difficulty)?;
        self.commit(block.clone(), self.pending.len())?;
        Ok(block)
    }

    /// [`Blockchain::mine_now`] with a cancellable, possibly parallel search.
    /// A cancelled search leaves the chain and pool untouched.
    pub fn mine_now_with(
        &mut self,
        miner: &Miner,
        reward_address: &str,
    ) -> Result<SealOutcome<Block>, ChainError> {
        let body = self.candidate_body(reward_address);
        match Block::mine(self.tail_hash(), body, self.difficulty, miner)? {
            SealOutcome::Sealed(block) => {
                self.commit(block.clone(), self.pending.len())?;
                Ok(SealOutcome::Sealed(block))
            }
            SealOutcome::Cancelled => Ok(SealOutcome::Cancelled),
        }
    }

    /// Appends `block`, then drops the first `drained` pool entries it was
    /// built from.
    pub(crate) fn commit(&mut self, block: Block, drained: usize) -> Result<(), ChainError> {
        self.append(block)?;
        let drained = drained.min(self.pending.len());
        self.pending.drain(..drained);
        Ok(())
    }

    /// Appends an externally built block after checking its seal and
    /// re-validating the whole chain with it in place.
    pub fn append(&mut self, block: Block) -> Result<(), ChainError> {
        let recomputed = block.recompute_hash();
        if recomputed != block.block_hash {
            return Err(ChainError::TamperedBlock(format!(
                "Incoming block stores hash {} but its header hashes to {}",
                block.hash_str(),
                hash_to_hex(&recomputed)
            )));
        }

        validate_sequence(
            self.blocks.iter().chain(std::iter::once(&block)),
            self.difficulty,
            self.miner_reward,
        )
        .map_err(|e| match e {
            ChainError::ChainInvalid(_) => e,
            other => ChainError::ChainInvalid(other.to_string()),
        })?;

        info!(
            height = self.blocks.len(),
            hash = %block.hash_str(),
            transactions = block.transactions.len(),
            "Block appended"
        );
        self.blocks.push(block);
        Ok(())
    }

    /// Read-only audit of every block and link; returns the first failure.
    pub fn validate_chain(&self) -> Result<(), ChainError> {
        validate_sequence(&self.blocks, self.difficulty, self.miner_reward)
    }

    pub fn balances(&self) -> Balances {
        Balances::from_blocks(&self.blocks)
    }

    pub fn balance_of(&self, address: &str) -> Amount {
        self.balances().get_balance(address)
    }
}
