//! Test utilities for ledger testing

use crate::config::LedgerConfig;
use crate::core::{Block, Blockchain, ProofOfWork};
use crate::error::{BlockchainError, Result};
use crate::wallet::Wallet;
use tempfile::TempDir;

/// Easy, constant difficulty so tests mine in microseconds
pub fn test_config(capacity: usize) -> LedgerConfig {
    LedgerConfig {
        capacity,
        initial_complexity: 1,
        min_complexity: 0,
        max_complexity: 2,
        min_block_gap_ms: 0,
        max_block_gap_ms: u64::MAX,
        ..LedgerConfig::default()
    }
}

/// Create a temporary directory for testing
pub fn create_temp_dir() -> Result<TempDir> {
    tempfile::tempdir().map_err(|e| BlockchainError::Io(e.to_string()))
}

/// Create an in-memory test ledger
pub fn create_test_ledger(capacity: usize) -> Blockchain {
    Blockchain::new(test_config(capacity)).expect("test ledger")
}

/// Ask for a challenge on behalf of `miner`, solve it and offer the block
pub fn mine_next_block(ledger: &Blockchain, miner: &Wallet) -> Result<Block> {
    let challenge = ledger.get_challenge(&miner.party())?;
    let block = ProofOfWork::new_proof_of_work(&challenge).run(miner.get_title())?;
    ledger.offer_block(block.clone())?;
    Ok(block)
}

/// Give `wallet` one block reward by letting it mine the next block
pub fn fund_party(ledger: &Blockchain, wallet: &Wallet) -> Block {
    mine_next_block(ledger, wallet).expect("funding block")
}
