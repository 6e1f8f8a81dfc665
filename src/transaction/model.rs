use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::blockchain::{MINING_REWARD, REWARD_SENDER};

/// A transfer of coins between two participants. Immutable once created;
/// equality over all four fields is what pool reconciliation matches on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    /// Hex-encoded DER ECDSA signature; empty only on the mining reward.
    pub signature: String,
    pub amount: u64,
}

impl Transaction {
    pub fn new(sender: String, recipient: String, signature: String, amount: u64) -> Self {
        Self {
            sender,
            recipient,
            signature,
            amount,
        }
    }

    /// The synthetic reward credited to the miner of each block. Carries no
    /// signature and never passes through admission.
    pub fn reward(recipient: &str) -> Self {
        Self {
            sender: REWARD_SENDER.to_string(),
            recipient: recipient.to_string(),
            signature: String::new(),
            amount: MINING_REWARD,
        }
    }

    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER && self.signature.is_empty()
    }

    /// Canonical form: the (sender, recipient, amount) triple. The signature
    /// is excluded from everything that gets hashed or signed. Keys
    /// serialize in sorted order, so the encoding is stable.
    pub fn canonical(&self) -> Value {
        json!({
            "sender": self.sender,
            "recipient": self.recipient,
            "amount": self.amount,
        })
    }

    /// SHA-256 of the canonical triple; the message each sender signs.
    pub fn sighash(&self) -> [u8; 32] {
        let payload = serde_json::to_vec(&self.canonical()).expect("canonical triple serializes");
        let mut hasher = Sha256::new();
        hasher.update(&payload);
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }
}

/// Canonical array form of a transaction sequence, as hashed into
/// proof-of-work guesses and block digests.
pub fn canonical_list(transactions: &[Transaction]) -> Value {
    Value::Array(transactions.iter().map(Transaction::canonical).collect())
}
