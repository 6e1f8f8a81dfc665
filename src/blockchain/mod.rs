pub mod block;
pub mod model;

pub use block::Block;
pub use model::{Blockchain, MiningJob, proof_of_work};

/// Reward credited to the miner of each block.
pub const MINING_REWARD: u64 = 10;

/// Reserved sender of the per-block reward transaction.
pub const REWARD_SENDER: &str = "MINING";

/// Proof-of-Work difficulty (number of leading zeros in the hex digest).
pub const POW_DIFFICULTY: usize = 2;

/// Proof carried by the fixed genesis block.
pub const GENESIS_PROOF: u64 = 100;

/// Candidates tried between stop-flag checks during the proof search.
pub const POW_CHECK_INTERVAL: u64 = 1024;
