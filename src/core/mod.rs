//! Core ledger functionality
//!
//! This module contains the fundamental ledger components including blocks,
//! signed transactions, mining challenges, proof-of-work and the shared
//! `Blockchain` that admits transactions and blocks.

pub mod balance;
pub mod block;
pub mod blockchain;
pub mod challenge;
pub mod difficulty;
pub mod merkle;
pub mod proof_of_work;
pub mod transaction;

pub use balance::transactions_balance;
pub use block::{Block, GENESIS_HASH};
pub use blockchain::{Blockchain, CloseHandler};
pub use challenge::{target_prefix, Challenge, EpochFlag};
pub use difficulty::DifficultyAdjustment;
pub use merkle::MerkleTree;
pub use proof_of_work::ProofOfWork;
pub use transaction::Transaction;
