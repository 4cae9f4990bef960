use crate::blockchain::core::block::Block;
use crate::crypto::{hash_to_hex, ZERO_HASH};
use crate::error::ChainError;
use crate::transaction::Amount;

/// Audits an ordered block sequence from genesis onwards.
///
/// Per block: body transactions, reward count, aggregate root, reward amount
/// within `0..=max_reward`, stored hash against the recomputed header hash,
/// proof of work, then linkage to the predecessor (or to the zero hash for
/// genesis). Returns the first failure.
pub fn validate_sequence<'a, I>(
    blocks: I,
    min_difficulty: u32,
    max_reward: Amount,
) -> Result<(), ChainError>
where
    I: IntoIterator<Item = &'a Block>,
{
    let mut previous: Option<&Block> = None;

    for (height, block) in blocks.into_iter().enumerate() {
        validate_block(block, height, min_difficulty, max_reward)?;

        let expected_previous = previous.map_or(ZERO_HASH, |p| p.block_hash);
        if block.header.previous_hash != expected_previous {
            return Err(ChainError::ChainInvalid(format!(
                "Block {} links to {}, expected {}",
                height,
                hash_to_hex(&block.header.previous_hash),
                hash_to_hex(&expected_previous)
            )));
        }
        previous = Some(block);
    }
    Ok(())
}

fn validate_block(
    block: &Block,
    height: usize,
    min_difficulty: u32,
    max_reward: Amount,
) -> Result<(), ChainError> {
    block
        .validate_transactions()
        .map_err(|e| ChainError::ChainInvalid(format!("Block {}: {}", height, e)))?;

    let rewards = block.transactions.iter().filter(|tx| tx.is_reward()).count();
    if rewards > 1 {
        return Err(ChainError::ChainInvalid(format!(
            "Block {} carries {} reward transactions",
            height, rewards
        )));
    }

    let expected_root = Block::calculate_aggregate_root(&block.transactions);
    if expected_root != block.header.aggregate_root {
        return Err(ChainError::ChainInvalid(format!(
            "Block {} aggregate root mismatch. Expected {}, but got {}.",
            height,
            hash_to_hex(&expected_root),
            hash_to_hex(&block.header.aggregate_root)
        )));
    }

    if let Some(reward) = block.transactions.iter().find(|tx| tx.is_reward()) {
        let amount = reward.amount();
        if amount < Amount::ZERO || amount > max_reward {
            return Err(ChainError::ChainInvalid(format!(
                "Block {} reward {} is outside 0..={}",
                height, amount, max_reward
            )));
        }
    }

    let recomputed = block.recompute_hash();
    if recomputed != block.block_hash {
        return Err(ChainError::TamperedBlock(format!(
            "Block {} stores hash {} but its header hashes to {}",
            height,
            hash_to_hex(&block.block_hash),
            hash_to_hex(&recomputed)
        )));
    }

    if block.header.difficulty < min_difficulty || !block.meets_difficulty() {
        return Err(ChainError::ChainInvalid(format!(
            "Block {} does not satisfy proof of work at difficulty {}",
            height,
            block.header.difficulty.max(min_difficulty)
        )));
    }

    Ok(())
}
