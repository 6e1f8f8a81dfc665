use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use super::{Block, POW_CHECK_INTERVAL, REWARD_SENDER};
use crate::error::{ChainError, Result};
use crate::hashing::hash_block;
use crate::storage;
use crate::transaction::Transaction;
use crate::verification;
use crate::wallet;

/// Snapshot handed to the proof-of-work search: taken under the engine
/// lock, searched outside it, re-validated at commit.
#[derive(Debug, Clone)]
pub struct MiningJob {
    pub index: u64,
    pub last_hash: String,
    pub transactions: Vec<Transaction>,
}

/// The ledger engine. Owns the chain, the pending pool and the peer set;
/// every mutation goes through its methods and is persisted synchronously,
/// best effort. The API layer keeps the whole engine behind one mutex.
#[derive(Debug)]
pub struct Blockchain {
    pub chain: Vec<Block>,
    pub pending: Vec<Transaction>,
    pub peers: HashSet<String>,
    /// Public key of this node; mining rewards route here unless
    /// `reward_recipient` overrides it.
    pub identity: Option<String>,
    pub reward_recipient: Option<String>,
    data_path: Option<PathBuf>,
}

impl Blockchain {
    /// Initialize from the persisted snapshot when one exists and
    /// re-validates, otherwise from the fixed genesis block.
    pub fn new(identity: Option<String>, data_path: Option<PathBuf>) -> Self {
        let mut bc = Self {
            chain: vec![Block::genesis()],
            pending: Vec::new(),
            peers: HashSet::new(),
            identity,
            reward_recipient: None,
            data_path,
        };
        if let Some(path) = bc.data_path.as_ref() {
            if let Some(state) = storage::load_state(path) {
                if !state.chain.is_empty() && verification::verify_chain(&state.chain) {
                    bc.chain = state.chain;
                    bc.pending = state.pending;
                    bc.peers = state.peers;
                    info!(
                        "restored ledger state: {} block(s), {} pending, {} peer(s)",
                        bc.chain.len(),
                        bc.pending.len(),
                        bc.peers.len()
                    );
                } else {
                    warn!("{}; starting from genesis", ChainError::InvalidChain);
                }
            }
        }
        bc
    }

    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("chain always holds at least the genesis block")
    }

    /// Net balance of `participant`: received minus sent, replayed over the
    /// whole chain plus the pending pool in both directions. Counting
    /// pending sends prevents double-spending within the same pool.
    pub fn balance_of(&self, participant: &str) -> i64 {
        let mined = self.chain.iter().flat_map(|block| block.transactions.iter());
        let mut balance: i64 = 0;
        for tx in mined.chain(self.pending.iter()) {
            if tx.recipient == participant {
                balance += tx.amount as i64;
            }
            if tx.sender == participant {
                balance -= tx.amount as i64;
            }
        }
        balance
    }

    /// Balance of this node's own identity.
    pub fn balance(&self) -> Option<i64> {
        self.identity.as_deref().map(|id| self.balance_of(id))
    }

    /// Surfaces a structurally broken chain as an explicit error so callers
    /// can prompt conflict resolution instead of silently continuing.
    pub fn check_integrity(&self) -> Result<()> {
        if verification::verify_chain(&self.chain) {
            Ok(())
        } else {
            Err(ChainError::InvalidChain)
        }
    }

    /// Admit a transaction into the pending pool. Fails closed: the pool is
    /// untouched unless the sender is legitimate and can afford the amount.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<()> {
        if transaction.sender == REWARD_SENDER {
            return Err(ChainError::ReservedSender);
        }
        if !verification::verify_transaction(&transaction, |who| self.balance_of(who)) {
            return Err(ChainError::InsufficientFunds);
        }
        self.pending.push(transaction);
        self.persist();
        Ok(())
    }

    /// Capture everything the proof search needs. Fails when the node has
    /// no identity, or when a pooled transaction carries a bad signature
    /// (rewards are exempt and never sit in the pool).
    pub fn mining_snapshot(&self) -> Result<MiningJob> {
        if self.identity.is_none() {
            return Err(ChainError::WalletMissing);
        }
        let all_signed = self
            .pending
            .iter()
            .filter(|tx| !tx.is_reward())
            .all(wallet::verify_transaction_signature);
        if !all_signed {
            return Err(ChainError::InvalidSignature);
        }
        Ok(MiningJob {
            index: self.last_block().index + 1,
            last_hash: hash_block(self.last_block()),
            transactions: self.pending.clone(),
        })
    }

    /// Append the block proved by `job` and `proof`. Re-checks that the tip
    /// is still the one the search started from; a chain that moved
    /// underneath the search fails with `StaleTip`. The reward transaction
    /// is appended to a copy of the snapshot, and only the snapshot's
    /// transactions leave the live pool, so admissions that raced with the
    /// search survive into the next block.
    pub fn commit_block(&mut self, job: MiningJob, proof: u64) -> Result<Block> {
        if hash_block(self.last_block()) != job.last_hash {
            return Err(ChainError::StaleTip);
        }
        let recipient = self
            .reward_recipient
            .clone()
            .or_else(|| self.identity.clone())
            .ok_or(ChainError::WalletMissing)?;
        let mut transactions = job.transactions.clone();
        transactions.push(Transaction::reward(&recipient));
        let block = Block::new(job.index, job.last_hash, transactions, proof);
        self.chain.push(block.clone());
        self.pending.retain(|tx| !job.transactions.contains(tx));
        self.persist();
        info!(
            "sealed block #{} with {} transaction(s)",
            block.index,
            block.transactions.len()
        );
        Ok(block)
    }

    /// Snapshot, search and commit in one call. The HTTP layer performs the
    /// three steps separately so the search runs outside the engine lock.
    pub fn mine_block(&mut self, stop: &AtomicBool) -> Result<Block> {
        let job = self.mining_snapshot()?;
        let proof = proof_of_work(&job.transactions, &job.last_hash, stop)
            .ok_or(ChainError::Interrupted)?;
        self.commit_block(job, proof)
    }

    /// Ingest a block mined by a peer. The proof covers the block's
    /// transactions minus the trailing reward; the linkage check runs
    /// against the local tip. On success, pooled transactions that appear
    /// in the block (matched on all four fields) are dropped.
    pub fn add_block(&mut self, block: Block) -> Result<()> {
        if !verification::valid_proof(block.proof_payload(), &block.previous_hash, block.proof) {
            return Err(ChainError::InvalidProofOfWork);
        }
        if hash_block(self.last_block()) != block.previous_hash {
            return Err(ChainError::InvalidBlockLinkage);
        }
        self.pending.retain(|tx| !block.transactions.contains(tx));
        info!("accepted peer block #{}", block.index);
        self.chain.push(block);
        self.persist();
        Ok(())
    }

    /// Longest-valid-chain rule over candidate chains fetched from peers.
    /// A candidate wins only if strictly longer than the current winner and
    /// it independently re-validates; ties keep the incumbent. On
    /// replacement the pending pool is discarded, since its transactions
    /// may reference a replaced history. Returns whether a replacement
    /// happened.
    pub fn resolve(&mut self, candidates: Vec<Vec<Block>>) -> bool {
        let mut winner: Option<Vec<Block>> = None;
        let mut winner_len = self.chain.len();
        for candidate in candidates {
            if candidate.len() > winner_len && verification::verify_chain(&candidate) {
                winner_len = candidate.len();
                winner = Some(candidate);
            }
        }
        match winner {
            Some(chain) => {
                info!(
                    "adopting peer chain of length {} (local was {})",
                    chain.len(),
                    self.chain.len()
                );
                self.chain = chain;
                self.pending.clear();
                self.persist();
                true
            }
            None => false,
        }
    }

    /// Returns whether the address was new.
    pub fn add_peer(&mut self, address: &str) -> bool {
        let added = self.peers.insert(address.to_string());
        if added {
            self.persist();
        }
        added
    }

    /// Returns whether the address was known.
    pub fn remove_peer(&mut self, address: &str) -> bool {
        let removed = self.peers.remove(address);
        if removed {
            self.persist();
        }
        removed
    }

    /// Synchronous best-effort snapshot after a committed mutation. A save
    /// failure is logged; the in-memory state stays authoritative.
    fn persist(&self) {
        if let Some(path) = self.data_path.as_ref() {
            if let Err(err) = storage::save_state(path, &self.chain, &self.pending, &self.peers) {
                warn!("failed to persist ledger state to {}: {err}", path.display());
            }
        }
    }
}

/// Brute-force proof search over a stable snapshot, starting at 0. Runs
/// outside the engine lock; the stop flag is checked every
/// POW_CHECK_INTERVAL candidates and interrupts the search with `None`.
pub fn proof_of_work(
    transactions: &[Transaction],
    last_hash: &str,
    stop: &AtomicBool,
) -> Option<u64> {
    let mut proof: u64 = 0;
    loop {
        if proof % POW_CHECK_INTERVAL == 0 && stop.load(Ordering::Relaxed) {
            return None;
        }
        if verification::valid_proof(transactions, last_hash, proof) {
            return Some(proof);
        }
        proof += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::{Blockchain, proof_of_work};
    use crate::blockchain::{Block, MINING_REWARD};
    use crate::error::ChainError;
    use crate::hashing::hash_block;
    use crate::transaction::Transaction;
    use crate::verification::verify_chain;
    use crate::wallet::Wallet;

    fn stop_never() -> AtomicBool {
        AtomicBool::new(false)
    }

    fn signed_transfer(from: &Wallet, to: &str, amount: u64) -> Transaction {
        Transaction::new(
            from.public_key_hex(),
            to.to_string(),
            from.sign_transaction(to, amount),
            amount,
        )
    }

    #[test]
    fn fresh_ledger_has_only_the_genesis_block() {
        let bc = Blockchain::new(None, None);
        assert_eq!(bc.chain.len(), 1);
        assert_eq!(bc.last_block(), &Block::genesis());
        assert_eq!(bc.balance_of("anyone"), 0);
    }

    #[test]
    fn mining_and_transfer_scenario() {
        let walter = Wallet::generate();
        let ada = Wallet::generate();
        let walter_id = walter.public_key_hex();
        let ada_id = ada.public_key_hex();
        let stop = stop_never();

        let mut bc = Blockchain::new(Some(walter_id.clone()), None);
        assert_eq!(bc.balance_of(&walter_id), 0);

        // Empty pool: the mined block holds just the reward.
        let block = bc.mine_block(&stop).unwrap();
        assert_eq!(block.index, 1);
        assert_eq!(block.transactions.len(), 1);
        assert!(block.transactions[0].is_reward());
        assert_eq!(bc.balance_of(&walter_id), MINING_REWARD as i64);

        let tx = signed_transfer(&walter, &ada_id, 5);
        bc.add_transaction(tx).unwrap();
        assert_eq!(bc.pending.len(), 1);
        assert_eq!(bc.balance_of(&walter_id), 5);
        assert_eq!(bc.balance_of(&ada_id), 5);

        let block = bc.mine_block(&stop).unwrap();
        assert_eq!(block.transactions.len(), 2);
        assert!(block.transactions.last().unwrap().is_reward());
        assert!(bc.pending.is_empty());
        assert_eq!(bc.balance_of(&walter_id), 15);
        assert_eq!(bc.balance_of(&ada_id), 5);
        assert!(verify_chain(&bc.chain));
    }

    #[test]
    fn unaffordable_transaction_is_rejected_without_mutation() {
        let walter = Wallet::generate();
        let mut bc = Blockchain::new(Some(walter.public_key_hex()), None);
        let tx = signed_transfer(&walter, "someone", 1);
        assert_eq!(
            bc.add_transaction(tx.clone()),
            Err(ChainError::InsufficientFunds)
        );
        assert!(bc.pending.is_empty());
        // Rejection is idempotent.
        assert_eq!(bc.add_transaction(tx), Err(ChainError::InsufficientFunds));
        assert!(bc.pending.is_empty());
    }

    #[test]
    fn reward_sender_is_reserved() {
        let mut bc = Blockchain::new(None, None);
        let forged = Transaction::new("MINING".into(), "thief".into(), String::new(), 0);
        assert_eq!(bc.add_transaction(forged), Err(ChainError::ReservedSender));
    }

    #[test]
    fn mining_requires_an_identity() {
        let mut bc = Blockchain::new(None, None);
        assert_eq!(
            bc.mine_block(&stop_never()).unwrap_err(),
            ChainError::WalletMissing
        );
    }

    #[test]
    fn mining_rejects_a_badly_signed_pooled_transaction() {
        let walter = Wallet::generate();
        let walter_id = walter.public_key_hex();
        let stop = stop_never();
        let mut bc = Blockchain::new(Some(walter_id.clone()), None);
        bc.mine_block(&stop).unwrap();

        let mut tx = signed_transfer(&walter, "ada", 5);
        tx.amount = 6; // signature no longer covers the triple
        bc.pending.push(tx);
        assert_eq!(
            bc.mine_block(&stop).unwrap_err(),
            ChainError::InvalidSignature
        );
    }

    #[test]
    fn commit_fails_when_the_tip_moved() {
        let walter = Wallet::generate();
        let stop = stop_never();
        let mut bc = Blockchain::new(Some(walter.public_key_hex()), None);

        let job = bc.mining_snapshot().unwrap();
        let proof = proof_of_work(&job.transactions, &job.last_hash, &stop).unwrap();
        bc.mine_block(&stop).unwrap();
        assert_eq!(bc.commit_block(job, proof), Err(ChainError::StaleTip));
        assert_eq!(bc.chain.len(), 2);
    }

    #[test]
    fn proof_search_honors_the_stop_flag() {
        let stop = AtomicBool::new(false);
        stop.store(true, Ordering::Relaxed);
        assert_eq!(proof_of_work(&[], "last", &stop), None);
    }

    #[test]
    fn peer_block_with_valid_proof_but_wrong_linkage_is_rejected() {
        let stop = stop_never();
        let foreign_hash = "f".repeat(64);
        let proof = proof_of_work(&[], &foreign_hash, &stop).unwrap();
        let block = Block::new(1, foreign_hash, vec![Transaction::reward("peer")], proof);

        let mut bc = Blockchain::new(None, None);
        assert_eq!(bc.add_block(block), Err(ChainError::InvalidBlockLinkage));
        assert_eq!(bc.chain.len(), 1);
    }

    #[test]
    fn peer_block_with_bad_proof_is_rejected() {
        let mut bc = Blockchain::new(None, None);
        let last_hash = hash_block(bc.last_block());
        let mut bad_proof = 0;
        while crate::verification::valid_proof(&[], &last_hash, bad_proof) {
            bad_proof += 1;
        }
        let block = Block::new(1, last_hash, vec![Transaction::reward("peer")], bad_proof);
        assert_eq!(bc.add_block(block), Err(ChainError::InvalidProofOfWork));
        assert_eq!(bc.chain.len(), 1);
    }

    #[test]
    fn accepted_peer_block_reconciles_the_pool() {
        let walter = Wallet::generate();
        let walter_id = walter.public_key_hex();
        let stop = stop_never();

        let mut miner = Blockchain::new(Some(walter_id.clone()), None);
        let mut follower = Blockchain::new(Some(walter_id.clone()), None);

        let funding = miner.mine_block(&stop).unwrap();
        follower.add_block(funding).unwrap();

        let tx = signed_transfer(&walter, "ada", 5);
        miner.add_transaction(tx.clone()).unwrap();
        follower.add_transaction(tx).unwrap();

        let block = miner.mine_block(&stop).unwrap();
        follower.add_block(block).unwrap();
        assert!(follower.pending.is_empty());
        assert_eq!(follower.chain.len(), 3);
        assert_eq!(follower.balance_of(&walter_id), 15);
    }

    #[test]
    fn resolve_adopts_a_longer_valid_chain_and_clears_the_pool() {
        let miner = Wallet::generate();
        let stop = stop_never();

        let mut remote = Blockchain::new(Some(miner.public_key_hex()), None);
        remote.mine_block(&stop).unwrap();
        remote.mine_block(&stop).unwrap();

        let mut local = Blockchain::new(Some(miner.public_key_hex()), None);
        local.mine_block(&stop).unwrap();
        local
            .pending
            .push(Transaction::new("x".into(), "y".into(), "sig".into(), 0));

        assert!(local.resolve(vec![remote.chain.clone()]));
        assert_eq!(local.chain, remote.chain);
        assert!(local.pending.is_empty());
    }

    #[test]
    fn resolve_keeps_the_local_chain_against_an_invalid_candidate() {
        let miner = Wallet::generate();
        let stop = stop_never();

        let mut remote = Blockchain::new(Some(miner.public_key_hex()), None);
        remote.mine_block(&stop).unwrap();
        remote.mine_block(&stop).unwrap();
        let mut tampered = remote.chain.clone();
        tampered[1].transactions[0].amount += 1;

        let mut local = Blockchain::new(Some(miner.public_key_hex()), None);
        local.mine_block(&stop).unwrap();
        let before = local.chain.clone();

        assert!(!local.resolve(vec![tampered]));
        assert_eq!(local.chain, before);
    }

    #[test]
    fn resolve_ties_keep_the_incumbent() {
        let miner = Wallet::generate();
        let stop = stop_never();

        let mut remote = Blockchain::new(Some(miner.public_key_hex()), None);
        remote.mine_block(&stop).unwrap();
        let mut local = Blockchain::new(Some(miner.public_key_hex()), None);
        local.mine_block(&stop).unwrap();
        let before = local.chain.clone();

        assert!(!local.resolve(vec![remote.chain.clone()]));
        assert_eq!(local.chain, before);
    }

    #[test]
    fn peer_set_deduplicates() {
        let mut bc = Blockchain::new(None, None);
        assert!(bc.add_peer("localhost:8081"));
        assert!(!bc.add_peer("localhost:8081"));
        assert!(bc.remove_peer("localhost:8081"));
        assert!(!bc.remove_peer("localhost:8081"));
    }
}
