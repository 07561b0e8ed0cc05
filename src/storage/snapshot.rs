use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use crate::wallet::Wallet;
use log::info;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::path::Path;

const LEDGER_TREE: &str = "ledger";
const SNAPSHOT_KEY: &str = "snapshot";

/// Everything needed to rebuild a ledger, including the owner's key
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct LedgerSnapshot {
    pub owner: Wallet,
    pub chain: Vec<Block>,
    pub pool: Vec<Transaction>,
    pub complexity: u32,
    pub next_transaction_id: u64,
    pub last_block_time: i64,
}

/// Sled-backed store keeping the latest snapshot of one ledger
pub struct SnapshotStore {
    db: Db,
    tree: Tree,
}

impl SnapshotStore {
    pub fn open(path: &Path) -> Result<SnapshotStore> {
        let db = sled::open(path)
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        let tree = db
            .open_tree(LEDGER_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open ledger tree: {e}")))?;
        Ok(SnapshotStore { db, tree })
    }

    /// Replace the stored snapshot and flush it to disk
    pub fn save(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        let bytes = serialize(snapshot)?;
        self.tree
            .insert(SNAPSHOT_KEY, bytes)
            .map_err(|e| BlockchainError::Database(format!("Failed to store snapshot: {e}")))?;
        self.db
            .flush()
            .map_err(|e| BlockchainError::Database(format!("Failed to flush database: {e}")))?;
        info!(
            "Saved ledger snapshot with {} blocks and {} pending transactions",
            snapshot.chain.len(),
            snapshot.pool.len()
        );
        Ok(())
    }

    /// `None` when nothing has been saved yet
    pub fn load(&self) -> Result<Option<LedgerSnapshot>> {
        let bytes = self
            .tree
            .get(SNAPSHOT_KEY)
            .map_err(|e| BlockchainError::Database(format!("Failed to read snapshot: {e}")))?;
        bytes.map(|bytes| deserialize(&bytes)).transpose()
    }
}
