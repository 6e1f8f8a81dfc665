use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::GENESIS_PROOF;
use crate::transaction::{Transaction, canonical_list};

/// A single block in the chain. The last transaction of a mined block is
/// always the mining reward; it is excluded when the proof is re-verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub timestamp: i64, // Unix timestamp (UTC)
}

impl Block {
    /// The fixed genesis block. Constant fields (including the zero
    /// timestamp) so every node derives the same genesis hash.
    pub fn genesis() -> Self {
        Self {
            index: 0,
            previous_hash: String::new(),
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            timestamp: 0,
        }
    }

    pub fn new(
        index: u64,
        previous_hash: String,
        transactions: Vec<Transaction>,
        proof: u64,
    ) -> Self {
        Self {
            index,
            previous_hash,
            transactions,
            proof,
            timestamp: Utc::now().timestamp(),
        }
    }

    /// Canonical JSON used for hashing: keys in sorted order, transactions
    /// reduced to their canonical triples (signatures excluded).
    pub fn canonical(&self) -> Value {
        json!({
            "index": self.index,
            "previous_hash": self.previous_hash,
            "proof": self.proof,
            "timestamp": self.timestamp,
            "transactions": canonical_list(&self.transactions),
        })
    }

    /// The transactions covered by this block's proof-of-work: everything
    /// except the trailing reward.
    pub fn proof_payload(&self) -> &[Transaction] {
        self.transactions
            .split_last()
            .map_or(&[][..], |(_, rest)| rest)
    }
}

#[cfg(test)]
mod tests {
    use super::Block;
    use crate::transaction::Transaction;

    #[test]
    fn genesis_is_fixed() {
        let genesis = Block::genesis();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "");
        assert_eq!(genesis.proof, 100);
        assert_eq!(genesis.timestamp, 0);
        assert!(genesis.transactions.is_empty());
        assert_eq!(genesis, Block::genesis());
    }

    #[test]
    fn proof_payload_excludes_the_trailing_reward() {
        let tx = Transaction::new("a".into(), "b".into(), "sig".into(), 2);
        let block = Block::new(1, "prev".into(), vec![tx.clone(), Transaction::reward("a")], 0);
        assert_eq!(block.proof_payload(), &[tx]);
        assert!(Block::genesis().proof_payload().is_empty());
    }
}
