use crate::blockchain::{Block, POW_DIFFICULTY};
use crate::hashing::{hash_block, hash_bytes};
use crate::transaction::{Transaction, canonical_list};

/// Proof-of-Work difficulty predicate: the digest of
/// canonical(transactions) + last_hash + proof must start with
/// POW_DIFFICULTY hex zeros.
pub fn valid_proof(transactions: &[Transaction], last_hash: &str, proof: u64) -> bool {
    let encoded =
        serde_json::to_string(&canonical_list(transactions)).expect("canonical list serializes");
    let guess = format!("{encoded}{last_hash}{proof}");
    hash_bytes(guess.as_bytes()).starts_with(&"0".repeat(POW_DIFFICULTY))
}

/// Affordability check: the sender's derived balance covers the amount.
/// The mining reward never passes through this gate.
pub fn verify_transaction<F>(transaction: &Transaction, get_balance: F) -> bool
where
    F: Fn(&str) -> i64,
{
    get_balance(&transaction.sender) >= transaction.amount as i64
}

/// Conjunction of `verify_transaction` over the pool. Diagnostic only,
/// not a gate on individual operations.
pub fn verify_transactions<F>(pool: &[Transaction], get_balance: F) -> bool
where
    F: Fn(&str) -> i64,
{
    pool.iter().all(|tx| verify_transaction(tx, &get_balance))
}

/// Validate the whole chain: linkage first, then proof-of-work over each
/// block's transactions minus the trailing reward. The genesis block is
/// vacuously valid; the first failure short-circuits. A block that fails
/// the linkage check never reaches the proof check.
pub fn verify_chain(chain: &[Block]) -> bool {
    for (index, block) in chain.iter().enumerate() {
        if index == 0 {
            continue;
        }
        if block.previous_hash != hash_block(&chain[index - 1]) {
            return false;
        }
        if !valid_proof(block.proof_payload(), &block.previous_hash, block.proof) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::{valid_proof, verify_chain, verify_transaction, verify_transactions};
    use crate::blockchain::{Block, proof_of_work};
    use crate::hashing::hash_block;
    use crate::transaction::Transaction;

    fn chain_of(lengths: usize) -> Vec<Block> {
        let stop = AtomicBool::new(false);
        let mut chain = vec![Block::genesis()];
        for i in 1..=lengths {
            let tx = Transaction::new("faucet".into(), "holder".into(), "sig".into(), 1);
            let last_hash = hash_block(chain.last().unwrap());
            let proof = proof_of_work(std::slice::from_ref(&tx), &last_hash, &stop).unwrap();
            let block = Block::new(
                i as u64,
                last_hash,
                vec![tx, Transaction::reward("holder")],
                proof,
            );
            chain.push(block);
        }
        chain
    }

    #[test]
    fn valid_proof_is_deterministic() {
        let txs = vec![Transaction::new("a".into(), "b".into(), String::new(), 1)];
        let first = valid_proof(&txs, "lasthash", 42);
        assert_eq!(first, valid_proof(&txs, "lasthash", 42));
    }

    #[test]
    fn valid_chains_verify() {
        assert!(verify_chain(&[Block::genesis()]));
        assert!(verify_chain(&chain_of(3)));
    }

    #[test]
    fn tampered_amount_invalidates_the_chain() {
        let mut chain = chain_of(2);
        chain[1].transactions[0].amount += 1;
        assert!(!verify_chain(&chain));
    }

    #[test]
    fn tampered_previous_hash_invalidates_the_chain() {
        let mut chain = chain_of(2);
        chain[2].previous_hash = "0".repeat(64);
        assert!(!verify_chain(&chain));
    }

    #[test]
    fn tampered_proof_invalidates_the_chain() {
        let mut chain = chain_of(2);
        chain[1].proof += 1;
        assert!(!verify_chain(&chain));
    }

    #[test]
    fn affordability_gate() {
        let tx = Transaction::new("a".into(), "b".into(), String::new(), 5);
        assert!(verify_transaction(&tx, |_| 5));
        assert!(!verify_transaction(&tx, |_| 4));

        let pool = vec![
            Transaction::new("a".into(), "b".into(), String::new(), 3),
            Transaction::new("a".into(), "b".into(), String::new(), 6),
        ];
        assert!(verify_transactions(&pool, |_| 6));
        assert!(!verify_transactions(&pool, |_| 5));
    }
}
