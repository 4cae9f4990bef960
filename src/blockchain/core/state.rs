use crate::blockchain::core::block::Block;
use crate::transaction::{Amount, Transaction};
use std::collections::HashMap;

/// Per-address balances derived from sealed blocks. Read-only view; no
/// spending limit is enforced when transactions are admitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balances {
    pub address_balances: HashMap<String, Amount>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Self {
        let mut balances = Self::new();
        for block in blocks {
            for tx in &block.transactions {
                balances.apply_transaction(tx);
            }
        }
        balances
    }

    pub fn get_balance(&self, address: &str) -> Amount {
        self.address_balances
            .get(address)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn apply_transaction(&mut self, tx: &Transaction) {
        let amount = tx.amount();
        if let Transaction::Transfer(transfer) = tx {
            let sender = self
                .address_balances
                .entry(transfer.from.clone())
                .or_insert(Amount::ZERO);
            *sender = sender.saturating_sub(amount);
        }
        let recipient = self
            .address_balances
            .entry(tx.to().to_string())
            .or_insert(Amount::ZERO);
        *recipient = recipient.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn test_rewards_and_transfers() {
        let alice = KeyPair::generate();
        let alice_id = alice.public_key_hex();

        let mut transfer = Transaction::transfer(alice_id.clone(), "bob", Amount::from_num(10));
        transfer.sign(&alice).unwrap();

        let mut balances = Balances::new();
        balances.apply_transaction(&Transaction::reward(alice_id.clone(), Amount::from_num(50)));
        balances.apply_transaction(&transfer);

        assert_eq!(balances.get_balance(&alice_id), Amount::from_num(40));
        assert_eq!(balances.get_balance("bob"), Amount::from_num(10));
        assert_eq!(balances.get_balance("nobody"), Amount::ZERO);
    }

    #[test]
    fn test_overdraft_goes_negative() {
        let mut balances = Balances::new();
        balances.apply_transaction(&Transaction::transfer("a", "b", Amount::from_num(3)));
        assert_eq!(balances.get_balance("a"), Amount::from_num(-3));
    }
}
