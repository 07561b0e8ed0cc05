use crate::core::{Block, Challenge, MerkleTree, Transaction};
use crate::error::ChallengeExpired;
use crate::utils::hex_digest;
use log::{debug, trace};
use rand::Rng;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

// Nonces are drawn from the non-negative 63-bit range
const MAX_NONCE: u64 = i64::MAX as u64;

/// Brute-force search for a nonce whose block hash meets a challenge's prefix
pub struct ProofOfWork<'a> {
    challenge: &'a Challenge,
    transactions_root: String,
}

impl<'a> ProofOfWork<'a> {
    pub fn new_proof_of_work(challenge: &'a Challenge) -> ProofOfWork<'a> {
        ProofOfWork {
            challenge,
            transactions_root: MerkleTree::transactions_root_hex(challenge.transactions()),
        }
    }

    fn prepare_data(&self, nonce: u64) -> String {
        prepare_data(
            &self.transactions_root,
            self.challenge.complexity(),
            nonce,
            self.challenge.previous_hash(),
        )
    }

    /// Search until a qualifying hash is found or the epoch is won elsewhere
    pub fn run(&self, miner: &str) -> Result<Block, ChallengeExpired> {
        self.search(miner, None)
    }

    /// Like `run`, but also gives up as soon as `cancel` is raised
    pub fn run_until(&self, miner: &str, cancel: &AtomicBool) -> Result<Block, ChallengeExpired> {
        self.search(miner, Some(cancel))
    }

    fn search(&self, miner: &str, cancel: Option<&AtomicBool>) -> Result<Block, ChallengeExpired> {
        let mut rng = rand::thread_rng();
        let prefix = self.challenge.target_prefix();
        debug!(
            "Seeking hash for block #{} with {} transactions which starts with: '{prefix}'",
            self.challenge.next_block_id(),
            self.challenge.transactions().len()
        );

        let mut attempts: u64 = 0;
        loop {
            let cancelled = cancel.is_some_and(|flag| flag.load(Ordering::Acquire));
            if cancelled || self.challenge.is_done() {
                trace!("Abandoning search after {attempts} attempts");
                return Err(ChallengeExpired {
                    block_id: self.challenge.next_block_id(),
                });
            }
            let nonce = rng.gen_range(0..MAX_NONCE);
            let hash = hex_digest(&self.prepare_data(nonce));
            attempts += 1;

            if hash.starts_with(prefix) {
                debug!("Found appropriate hash {hash} with nonce {nonce} after {attempts} attempts");
                return Ok(Block::new(
                    self.challenge.next_block_id(),
                    self.challenge.complexity(),
                    nonce,
                    hash,
                    miner.to_string(),
                    self.challenge.transactions().clone(),
                ));
            }
        }
    }

    /// Recompute a block's hash against the hash of its predecessor
    pub fn calculate_hash(block: &Block, previous_hash: &str) -> String {
        calculate_hash(
            block.get_transactions(),
            block.get_complexity(),
            block.get_nonce(),
            previous_hash,
        )
    }

    pub fn validate(block: &Block, previous_hash: &str) -> bool {
        block.get_hash() == Self::calculate_hash(block, previous_hash)
    }
}

fn prepare_data(transactions_root: &str, complexity: u32, nonce: u64, previous_hash: &str) -> String {
    format!("{transactions_root}{complexity}{nonce}{previous_hash}")
}

/// `hex(SHA256(tx_root ++ complexity ++ nonce ++ previous_hash))`
pub fn calculate_hash(
    transactions: &BTreeSet<Transaction>,
    complexity: u32,
    nonce: u64,
    previous_hash: &str,
) -> String {
    let root = MerkleTree::transactions_root_hex(transactions);
    hex_digest(&prepare_data(&root, complexity, nonce, previous_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EpochFlag;

    fn create_test_challenge(complexity: u32) -> (Challenge, std::sync::Arc<EpochFlag>) {
        let flag = EpochFlag::new(1);
        let challenge = Challenge::new(
            1,
            "0".to_string(),
            complexity,
            BTreeSet::new(),
            std::sync::Arc::clone(&flag),
        );
        (challenge, flag)
    }

    #[test]
    fn test_mined_block_meets_prefix_and_validates() {
        let (challenge, _flag) = create_test_challenge(2);
        let pow = ProofOfWork::new_proof_of_work(&challenge);

        let block = pow.run("miner-1").unwrap();

        assert_eq!(block.get_id(), 1);
        assert_eq!(block.get_complexity(), 2);
        assert_eq!(block.get_miner(), "miner-1");
        assert!(block.get_hash().starts_with("00"));
        assert!(ProofOfWork::validate(&block, "0"));
    }

    #[test]
    fn test_validation_fails_against_other_predecessor() {
        let (challenge, _flag) = create_test_challenge(1);
        let block = ProofOfWork::new_proof_of_work(&challenge)
            .run("miner-1")
            .unwrap();

        assert!(!ProofOfWork::validate(&block, "not-the-parent"));
    }

    #[test]
    fn test_finished_epoch_aborts_search() {
        // No 64-char hex digest starts with 65 zeros, so only the flag can stop this
        let (challenge, flag) = create_test_challenge(65);
        flag.finish();

        let result = ProofOfWork::new_proof_of_work(&challenge).run("miner-1");
        assert_eq!(result, Err(ChallengeExpired { block_id: 1 }));
    }

    #[test]
    fn test_cancelled_search_gives_up() {
        let (challenge, _flag) = create_test_challenge(65);
        let cancel = AtomicBool::new(true);

        let result = ProofOfWork::new_proof_of_work(&challenge).run_until("miner-1", &cancel);
        assert_eq!(result, Err(ChallengeExpired { block_id: 1 }));
        assert!(!challenge.is_done());
    }

    #[test]
    fn test_prepare_data_consistency() {
        let (challenge, _flag) = create_test_challenge(2);
        let pow = ProofOfWork::new_proof_of_work(&challenge);

        assert_eq!(pow.prepare_data(12345), pow.prepare_data(12345));
        assert_ne!(pow.prepare_data(12345), pow.prepare_data(54321));
        assert!(pow.prepare_data(12345).ends_with("2123450"));
    }
}
