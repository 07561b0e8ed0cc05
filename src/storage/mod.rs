//! Data storage and persistence
//!
//! This module holds the memory pool of pending transactions and the
//! sled-backed snapshot store used to persist a ledger between runs.

pub mod memory_pool;
pub mod snapshot;

pub use memory_pool::MemoryPool;
pub use snapshot::{LedgerSnapshot, SnapshotStore};
