use crate::core::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Hash recorded for the synthetic genesis block
pub const GENESIS_HASH: &str = "0";

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Block {
    id: u64,
    complexity: u32,
    nonce: u64,
    hash: String,
    miner: String,
    transactions: BTreeSet<Transaction>,
}

impl Block {
    pub fn new(
        id: u64,
        complexity: u32,
        nonce: u64,
        hash: String,
        miner: String,
        transactions: BTreeSet<Transaction>,
    ) -> Block {
        Block {
            id,
            complexity,
            nonce,
            hash,
            miner,
            transactions,
        }
    }

    /// Sentinel predecessor of block #1; never stored in the chain
    pub fn genesis() -> Block {
        Block {
            id: 0,
            complexity: 0,
            nonce: 0,
            hash: String::from(GENESIS_HASH),
            miner: String::new(),
            transactions: BTreeSet::new(),
        }
    }

    pub fn get_id(&self) -> u64 {
        self.id
    }

    pub fn get_complexity(&self) -> u32 {
        self.complexity
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_miner(&self) -> &str {
        self.miner.as_str()
    }

    pub fn get_transactions(&self) -> &BTreeSet<Transaction> {
        &self.transactions
    }

    /// Highest transaction id stored in this block, if it has any
    pub fn max_transaction_id(&self) -> Option<u64> {
        self.transactions.iter().map(Transaction::get_id).max()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Block ID: {}", self.id)?;
        writeln!(f, "Complexity: {}", self.complexity)?;
        writeln!(f, "Nonce: {}", self.nonce)?;
        writeln!(f, "Mined by: {}", self.miner)?;
        writeln!(f, "Current block hash:")?;
        writeln!(f, "{}", self.hash)?;
        write!(f, "Transactions:")?;
        for transaction in &self.transactions {
            write!(f, "\n{transaction}")?;
        }
        Ok(())
    }
}
