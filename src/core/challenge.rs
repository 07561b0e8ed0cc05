//! Mining challenges and the epoch flag shared by everyone racing on one.

use crate::core::Transaction;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Completion flag of one mining epoch.
///
/// Every challenge issued during the epoch holds the same `Arc<EpochFlag>`.
/// The ledger finishes it exactly once, when a block for the epoch is
/// accepted, and then mints a new flag with the next generation number.
#[derive(Debug)]
pub struct EpochFlag {
    generation: u64,
    done: AtomicBool,
}

impl EpochFlag {
    pub fn new(generation: u64) -> Arc<EpochFlag> {
        Arc::new(EpochFlag {
            generation,
            done: AtomicBool::new(false),
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Returns false when the epoch had already been finished
    pub(crate) fn finish(&self) -> bool {
        !self.done.swap(true, Ordering::AcqRel)
    }
}

/// Immutable work order for the next block
#[derive(Debug, Clone)]
pub struct Challenge {
    next_block_id: u64,
    previous_hash: String,
    complexity: u32,
    target_prefix: String,
    transactions: BTreeSet<Transaction>,
    epoch: Arc<EpochFlag>,
}

impl Challenge {
    pub(crate) fn new(
        next_block_id: u64,
        previous_hash: String,
        complexity: u32,
        transactions: BTreeSet<Transaction>,
        epoch: Arc<EpochFlag>,
    ) -> Challenge {
        Challenge {
            next_block_id,
            previous_hash,
            complexity,
            target_prefix: target_prefix(complexity),
            transactions,
            epoch,
        }
    }

    pub fn next_block_id(&self) -> u64 {
        self.next_block_id
    }

    pub fn previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn complexity(&self) -> u32 {
        self.complexity
    }

    pub fn target_prefix(&self) -> &str {
        self.target_prefix.as_str()
    }

    pub fn transactions(&self) -> &BTreeSet<Transaction> {
        &self.transactions
    }

    pub fn generation(&self) -> u64 {
        self.epoch.generation()
    }

    /// Set once any block for this epoch has been accepted
    pub fn is_done(&self) -> bool {
        self.epoch.is_done()
    }
}

/// `complexity` copies of '0'
pub fn target_prefix(complexity: u32) -> String {
    "0".repeat(complexity as usize)
}
