use crate::crypto::{hash_to_hex, Sha256Hash};
use crate::error::ChainError;
use crate::miner::{meets_difficulty, seal_sequential, Miner, Seal, SealOutcome, MAX_DIFFICULTY};
use crate::transaction::Transaction;
use sha2::{Digest, Sha256};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BlockHeader {
    pub previous_hash: Sha256Hash,
    pub aggregate_root: Sha256Hash,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub difficulty: u32,
    pub nonce: u64,
}

impl BlockHeader {
    pub fn hash(&self) -> Sha256Hash {
        self.hash_with_nonce(self.nonce)
    }

    /// Header hash as if `nonce` were stored; lets the sealing search try
    /// candidates without cloning the header.
    pub fn hash_with_nonce(&self, nonce: u64) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.previous_hash);
        hasher.update(self.aggregate_root);
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.difficulty.to_le_bytes());
        hasher.update(nonce.to_le_bytes());
        hasher.finalize().into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    /// Hash of the sealed header, recorded at construction
    pub block_hash: Sha256Hash,
}

impl Block {
    /// Validates the body, then seals the header with an uncancellable
    /// sequential search starting at nonce 1.
    pub fn new(
        previous_hash: Sha256Hash,
        transactions: Vec<Transaction>,
        difficulty: u32,
    ) -> Result<Self, ChainError> {
        let header = Self::prepare_header(previous_hash, &transactions, difficulty)?;
        let seal = seal_sequential(&header);
        Ok(Self::from_seal(header, transactions, seal))
    }

    /// Like [`Block::new`], but the search is driven by `miner` and may be
    /// cancelled.
    pub fn mine(
        previous_hash: Sha256Hash,
        transactions: Vec<Transaction>,
        difficulty: u32,
        miner: &Miner,
    ) -> Result<SealOutcome<Self>, ChainError> {
        let header = Self::prepare_header(previous_hash, &transactions, difficulty)?;
        Ok(miner
            .seal(&header)
            .map(|seal| Self::from_seal(header, transactions, seal)))
    }

    fn prepare_header(
        previous_hash: Sha256Hash,
        transactions: &[Transaction],
        difficulty: u32,
    ) -> Result<BlockHeader, ChainError> {
        if difficulty > MAX_DIFFICULTY {
            return Err(ChainError::InvalidOperation(format!(
                "Difficulty {} exceeds maximum {}",
                difficulty, MAX_DIFFICULTY
            )));
        }
        Self::validate_body(transactions)?;

        Ok(BlockHeader {
            previous_hash,
            aggregate_root: Self::calculate_aggregate_root(transactions),
            timestamp: chrono::Utc::now().timestamp_millis().max(0) as u64,
            difficulty,
            nonce: 0,
        })
    }

    fn from_seal(mut header: BlockHeader, transactions: Vec<Transaction>, seal: Seal) -> Self {
        header.nonce = seal.nonce;
        info!(
            nonce = seal.nonce,
            hash = %hash_to_hex(&seal.hash),
            transactions = transactions.len(),
            "Block sealed"
        );
        Block {
            header,
            transactions,
            block_hash: seal.hash,
        }
    }

    fn validate_body(transactions: &[Transaction]) -> Result<(), ChainError> {
        for (index, tx) in transactions.iter().enumerate() {
            tx.verify().map_err(|e| e.at_index(index))?;
        }
        Ok(())
    }

    /// Re-checks every transaction; fails on the first invalid one.
    pub fn validate_transactions(&self) -> Result<(), ChainError> {
        Self::validate_body(&self.transactions)
    }

    /// Header hash from the current header fields. Differs from
    /// `block_hash` once any header field has been altered.
    pub fn recompute_hash(&self) -> Sha256Hash {
        self.header.hash()
    }

    pub fn hash(&self) -> Sha256Hash {
        self.block_hash
    }

    pub fn hash_str(&self) -> String {
        hash_to_hex(&self.block_hash)
    }

    pub fn meets_difficulty(&self) -> bool {
        meets_difficulty(&self.block_hash, self.header.difficulty)
    }

    /// SHA-256 over the u32-LE transaction count followed by each
    /// transaction's leaf hash in body order.
    pub fn calculate_aggregate_root(transactions: &[Transaction]) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update((transactions.len() as u32).to_le_bytes());
        for tx in transactions {
            hasher.update(tx.leaf_hash());
        }
        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyPair, ZERO_HASH};
    use crate::miner::CancelToken;
    use crate::transaction::Amount;

    fn signed_transfer(sender: &KeyPair, to: &str, amount: i64) -> Transaction {
        let mut tx = Transaction::transfer(sender.public_key_hex(), to, Amount::from_num(amount));
        tx.sign(sender).unwrap();
        tx
    }

    #[test]
    fn test_block_is_sealed_on_construction() {
        let block = Block::new(
            ZERO_HASH,
            vec![Transaction::reward("", Amount::from_num(0))],
            2,
        )
        .unwrap();

        assert!(block.hash_str().starts_with("00"));
        assert!(block.header.nonce >= 1);
        assert_eq!(block.recompute_hash(), block.block_hash);
        assert!(block.meets_difficulty());
    }

    #[test]
    fn test_header_alteration_changes_recomputed_hash() {
        let alice = KeyPair::generate();
        let block = Block::new([9u8; 32], vec![signed_transfer(&alice, "bob", 10)], 1).unwrap();

        let mut altered = block.clone();
        altered.header.timestamp += 1;
        assert_ne!(altered.recompute_hash(), altered.block_hash);

        let mut altered = block.clone();
        altered.header.previous_hash = ZERO_HASH;
        assert_ne!(altered.recompute_hash(), altered.block_hash);

        let mut altered = block.clone();
        altered.header.nonce += 1;
        assert_ne!(altered.recompute_hash(), altered.block_hash);

        let mut altered = block;
        altered.header.aggregate_root = [0u8; 32];
        assert_ne!(altered.recompute_hash(), altered.block_hash);
    }

    #[test]
    fn test_serde_reload_keeps_hash() {
        let block = Block::new(ZERO_HASH, vec![Transaction::reward("m", Amount::from_num(50))], 1)
            .unwrap();
        let json = serde_json::to_string(&block).unwrap();
        let reloaded: Block = serde_json::from_str(&json).unwrap();

        assert_eq!(reloaded, block);
        assert_eq!(reloaded.recompute_hash(), block.block_hash);
    }

    #[test]
    fn test_invalid_transaction_rejected_with_index() {
        let alice = KeyPair::generate();
        let mut tampered = signed_transfer(&alice, "bob", 10);
        if let Transaction::Transfer(t) = &mut tampered {
            t.amount = Amount::from_num(5);
        }
        let pool = vec![
            Transaction::reward("miner", Amount::from_num(50)),
            signed_transfer(&alice, "carol", 1),
            tampered,
        ];

        match Block::new(ZERO_HASH, pool, 1) {
            Err(ChainError::InvalidTransaction { index, .. }) => assert_eq!(index, Some(2)),
            other => panic!("Expected InvalidTransaction, got {:?}", other),
        }
    }

    #[test]
    fn test_excessive_difficulty_rejected() {
        let result = Block::new(ZERO_HASH, vec![], MAX_DIFFICULTY + 1);
        assert!(matches!(result, Err(ChainError::InvalidOperation(_))));
    }

    #[test]
    fn test_aggregate_root_binds_order_and_signatures() {
        let alice = KeyPair::generate();
        let a = signed_transfer(&alice, "bob", 1);
        let b = Transaction::reward("miner", Amount::from_num(50));

        let forward = Block::calculate_aggregate_root(&[a.clone(), b.clone()]);
        let reverse = Block::calculate_aggregate_root(&[b, a.clone()]);
        assert_ne!(forward, reverse);

        let mut unsigned = a.clone();
        if let Transaction::Transfer(t) = &mut unsigned {
            t.signature = None;
        }
        assert_ne!(
            Block::calculate_aggregate_root(&[a]),
            Block::calculate_aggregate_root(&[unsigned])
        );
    }

    #[test]
    fn test_mine_with_cancelled_token() {
        let token = CancelToken::new();
        token.cancel();
        let miner = Miner::new().with_cancel_token(token);

        let outcome = Block::mine(ZERO_HASH, vec![], MAX_DIFFICULTY, &miner).unwrap();
        assert!(outcome.is_cancelled());
    }

    #[test]
    fn test_mine_validates_before_searching() {
        let alice = KeyPair::generate();
        let unsigned = Transaction::transfer(alice.public_key_hex(), "bob", Amount::from_num(1));

        let result = Block::mine(ZERO_HASH, vec![unsigned], 1, &Miner::new());
        assert!(matches!(result, Err(ChainError::InvalidTransaction { .. })));
    }
}
