// This is the ledger - the single shared, mutable piece of the system.
// It owns the chain, the pool of pending transactions, the current complexity
// and the live mining epoch. Every mutation happens under one write lock, so
// a block or transaction is either fully admitted or not visible at all.
// Proof-of-work never runs here; miners search outside the lock on an
// immutable Challenge and come back with a finished block.

use crate::config::LedgerConfig;
use crate::core::challenge::target_prefix;
use crate::core::{
    transactions_balance, Block, Challenge, DifficultyAdjustment, EpochFlag, ProofOfWork,
    Transaction, GENESIS_HASH,
};
use crate::error::{Closed, CorruptedChain, RejectedBlock, RejectedTransaction, Result};
use crate::storage::{LedgerSnapshot, MemoryPool};
use crate::utils::current_timestamp;
use crate::wallet::{Party, Wallet};
use log::{debug, error, info, trace, warn};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Invoked once, when the ledger reaches its capacity
pub type CloseHandler = Box<dyn FnOnce(&Blockchain) + Send>;

// Everything the write lock protects as one logical unit
struct LedgerState {
    chain: Vec<Block>,
    pool: MemoryPool,
    complexity: u32,
    last_block_time: i64,
    epoch: Arc<EpochFlag>,
}

impl LedgerState {
    fn tip(&self) -> Block {
        self.chain.last().cloned().unwrap_or_else(Block::genesis)
    }

    fn tip_hash(&self) -> &str {
        self.chain
            .last()
            .map(Block::get_hash)
            .unwrap_or(GENESIS_HASH)
    }

    fn tip_id(&self) -> u64 {
        self.chain.last().map(Block::get_id).unwrap_or(0)
    }

    fn block_by_id(&self, id: u64) -> Option<Block> {
        if id == 0 {
            return Some(Block::genesis());
        }
        let index = usize::try_from(id - 1).ok()?;
        self.chain.get(index).cloned()
    }

    // Max id of the most recent non-empty block, 0 when there is none
    fn highest_transaction_id(&self) -> u64 {
        self.chain
            .iter()
            .rev()
            .find_map(Block::max_transaction_id)
            .unwrap_or(0)
    }

    fn confirmed_balance(&self, party: &Party) -> i64 {
        transactions_balance(
            self.chain.iter().flat_map(|block| block.get_transactions()),
            party,
        )
    }

    fn estimated_balance(&self, party: &Party) -> i64 {
        self.confirmed_balance(party) + transactions_balance(self.pool.iter(), party)
    }
}

// Write access that keeps the version stamp odd for as long as it is held
struct StateWriteGuard<'a> {
    state: RwLockWriteGuard<'a, LedgerState>,
    version: &'a AtomicU64,
}

impl Deref for StateWriteGuard<'_> {
    type Target = LedgerState;

    fn deref(&self) -> &LedgerState {
        &self.state
    }
}

impl DerefMut for StateWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut LedgerState {
        &mut self.state
    }
}

impl Drop for StateWriteGuard<'_> {
    fn drop(&mut self) {
        self.version.fetch_add(1, Ordering::Release);
    }
}

pub struct Blockchain {
    config: LedgerConfig,
    difficulty: DifficultyAdjustment,
    // I sign every reward with this wallet
    owner: Wallet,
    owner_party: Party,
    state: RwLock<LedgerState>,
    // I bump this on every write lock and release, so it stays odd while a writer holds it
    version: AtomicU64,
    // Last id handed out; restored ledgers start above anything already recorded
    next_transaction_id: AtomicU64,
    // I flip this once, inside the write lock that appends the last block
    closed: AtomicBool,
    on_close: Mutex<Option<CloseHandler>>,
}

impl Blockchain {
    /// Empty ledger owned by a freshly generated wallet
    pub fn new(config: LedgerConfig) -> Result<Blockchain> {
        config.validate()?;
        let owner = Wallet::new(config.owner_title.clone())?;
        Self::with_owner(config, owner)
    }

    /// Empty ledger whose rewards are paid by `owner`
    pub fn with_owner(config: LedgerConfig, owner: Wallet) -> Result<Blockchain> {
        config.validate()?;
        let state = LedgerState {
            chain: Vec::new(),
            pool: MemoryPool::new(),
            complexity: config.initial_complexity,
            last_block_time: current_timestamp()?,
            epoch: EpochFlag::new(1),
        };
        info!(
            "Created ledger with capacity {} and initial complexity {}",
            config.capacity, config.initial_complexity
        );
        Ok(Self::assemble(config, owner, state, 0))
    }

    /// Rebuild a ledger from a snapshot without verifying it; run `verify_chain` afterwards
    pub fn restore(config: LedgerConfig, snapshot: LedgerSnapshot) -> Result<Blockchain> {
        config.validate()?;
        let LedgerSnapshot {
            owner,
            chain,
            pool,
            complexity,
            next_transaction_id,
            last_block_time,
        } = snapshot;

        let bounded = complexity.clamp(config.min_complexity, config.max_complexity);
        if bounded != complexity {
            warn!("Snapshot complexity {complexity} clamped to {bounded}");
        }

        let pool: MemoryPool = pool.into_iter().collect();
        let highest_known = chain
            .iter()
            .filter_map(Block::max_transaction_id)
            .chain(pool.iter().map(Transaction::get_id))
            .max()
            .unwrap_or(0);
        let generation = chain.len() as u64 + 1;
        let state = LedgerState {
            chain,
            pool,
            complexity: bounded,
            last_block_time,
            epoch: EpochFlag::new(generation),
        };
        info!(
            "Restored ledger with {} blocks and {} pending transactions",
            state.chain.len(),
            state.pool.len()
        );
        Ok(Self::assemble(
            config,
            owner,
            state,
            next_transaction_id.max(highest_known),
        ))
    }

    fn assemble(
        config: LedgerConfig,
        owner: Wallet,
        state: LedgerState,
        last_transaction_id: u64,
    ) -> Blockchain {
        let closed = state.chain.len() >= config.capacity;
        Blockchain {
            difficulty: DifficultyAdjustment::from_config(&config),
            owner_party: owner.party(),
            owner,
            config,
            state: RwLock::new(state),
            version: AtomicU64::new(0),
            next_transaction_id: AtomicU64::new(last_transaction_id),
            closed: AtomicBool::new(closed),
            on_close: Mutex::new(None),
        }
    }

    /// Full internal state, for the persistence layer
    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.read_state();
        LedgerSnapshot {
            owner: self.owner.clone(),
            chain: state.chain.clone(),
            pool: state.pool.iter().cloned().collect(),
            complexity: state.complexity,
            next_transaction_id: self.next_transaction_id.load(Ordering::Acquire),
            last_block_time: state.last_block_time,
        }
    }

    /// Register the handler run at the closing transition. A ledger that is
    /// already closed has no transition left, so the handler never runs.
    pub fn set_on_close<F>(&self, handler: F)
    where
        F: FnOnce(&Blockchain) + Send + 'static,
    {
        let mut slot = self.on_close.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Box::new(handler));
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Party paying the mining rewards
    pub fn owner(&self) -> &Party {
        &self.owner_party
    }

    pub fn next_transaction_id(&self) -> u64 {
        self.next_transaction_id.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> StateWriteGuard<'_> {
        let state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        self.version.fetch_add(1, Ordering::AcqRel);
        StateWriteGuard {
            state,
            version: &self.version,
        }
    }

    // Optimistic read: capture the version stamp, read without waiting, and
    // accept the result only if no writer ran in between. Otherwise read
    // again under the shared lock.
    fn read_consistent<T>(&self, read: impl Fn(&LedgerState) -> T) -> T {
        let stamp = self.version.load(Ordering::Acquire);
        if stamp % 2 == 0 {
            if let Ok(state) = self.state.try_read() {
                let value = read(&state);
                drop(state);
                if self.version.load(Ordering::Acquire) == stamp {
                    return value;
                }
            }
        }
        trace!("Optimistic read invalidated, retrying under shared lock");
        let state = self.read_state();
        read(&state)
    }

    pub fn offer_transaction(
        &self,
        transaction: Transaction,
    ) -> std::result::Result<(), RejectedTransaction> {
        if self.is_closed() {
            return Err(RejectedTransaction::Closed);
        }
        if transaction.get_amount() < 0 {
            return Err(RejectedTransaction::NegativeAmount);
        }
        if transaction.get_sender() == transaction.get_recipient() {
            return Err(RejectedTransaction::SelfTransfer);
        }
        if !transaction.verify_signature() {
            debug!("Transaction #{} has an invalid signature", transaction.get_id());
            return Err(RejectedTransaction::BadSignature);
        }

        // I check closed again here, another thread may have appended the last block meanwhile
        let mut state = self.write_state();
        if self.is_closed() {
            return Err(RejectedTransaction::Closed);
        }
        if state.pool.contains_id(transaction.get_id()) {
            return Err(RejectedTransaction::Duplicate);
        }
        if transaction.get_id() <= state.highest_transaction_id() {
            return Err(RejectedTransaction::StaleId);
        }
        let available = state.estimated_balance(transaction.get_sender());
        if transaction.get_amount() > available {
            return Err(RejectedTransaction::InsufficientFunds {
                required: transaction.get_amount(),
                available,
            });
        }

        debug!("Transaction accepted to pool: {transaction}");
        self.next_transaction_id
            .fetch_max(transaction.get_id(), Ordering::AcqRel);
        state.pool.add(transaction);
        Ok(())
    }

    pub fn get_challenge(&self, miner: &Party) -> std::result::Result<Challenge, Closed> {
        if self.is_closed() {
            return Err(Closed);
        }

        let (tip_id, tip_hash, complexity, mut transactions, epoch) = self.read_consistent(|state| {
            (
                state.tip_id(),
                state.tip_hash().to_string(),
                state.complexity,
                state.pool.snapshot(),
                Arc::clone(&state.epoch),
            )
        });

        // I add the reward after the read, signing never happens under the lock
        transactions.insert(self.reward_transaction(miner));
        trace!(
            "Issued challenge for block #{} (epoch {}) to {miner}",
            tip_id + 1,
            epoch.generation()
        );
        Ok(Challenge::new(
            tip_id + 1,
            tip_hash,
            complexity,
            transactions,
            epoch,
        ))
    }

    fn reward_transaction(&self, miner: &Party) -> Transaction {
        let id = self.next_transaction_id();
        match Transaction::new_signed(id, &self.owner, miner.clone(), self.config.reward) {
            Ok(transaction) => transaction,
            Err(e) => {
                // Rewards are authorised by block admission, not by their signature
                warn!("Unable to sign reward transaction #{id}: {e}");
                Transaction::from_parts(
                    id,
                    self.owner_party.clone(),
                    miner.clone(),
                    self.config.reward,
                    Vec::new(),
                    self.owner.get_public_key().to_vec(),
                )
            }
        }
    }

    fn is_reward(&self, transaction: &Transaction) -> bool {
        transaction.get_sender() == &self.owner_party
            && transaction.get_amount() == self.config.reward
    }

    pub fn offer_block(&self, block: Block) -> std::result::Result<(), RejectedBlock> {
        if self.is_closed() {
            return Err(RejectedBlock::Closed);
        }

        let rewarded = block
            .get_transactions()
            .iter()
            .find(|transaction| self.is_reward(transaction))
            .map(|transaction| transaction.get_recipient().clone());

        let closed_now = {
            let mut state = self.write_state();
            if self.is_closed() {
                return Err(RejectedBlock::Closed);
            }
            self.verify_offered_block(&state, &block)?;

            info!(
                "Adding new block #{} with hash: {}",
                block.get_id(),
                block.get_hash()
            );
            let removed = state.pool.remove_all(block.get_transactions());
            state.chain.push(block);

            let now = now_millis();
            let gap = u64::try_from(now - state.last_block_time).unwrap_or(0);
            state.complexity = self.difficulty.next_complexity(state.complexity, gap);
            state.last_block_time = now;
            debug!(
                "{removed} transactions confirmed, {} still pending",
                state.pool.len()
            );

            // I use this to stop everyone still searching on the old tip
            let next_generation = state.epoch.generation() + 1;
            state.epoch.finish();
            state.epoch = EpochFlag::new(next_generation);

            let closed_now = state.chain.len() >= self.config.capacity;
            if closed_now {
                self.closed.store(true, Ordering::Release);
            }
            closed_now
        };

        if closed_now {
            self.notify_closed();
        }
        if let Some(miner) = rewarded {
            debug!(
                "Miner {miner} rewarded for block generation (confirmed / estimated balance: {} / {})",
                self.confirmed_balance(&miner),
                self.estimated_balance(&miner)
            );
        }
        Ok(())
    }

    fn verify_offered_block(
        &self,
        state: &LedgerState,
        block: &Block,
    ) -> std::result::Result<(), RejectedBlock> {
        trace!("Verifying offered block with hash: {}", block.get_hash());

        let expected = state.tip_id() + 1;
        if block.get_id() != expected {
            debug!(
                "Block rejected. ID ({}) differs from expected ({expected})",
                block.get_id()
            );
            return Err(RejectedBlock::BadId {
                expected,
                actual: block.get_id(),
            });
        }

        let prefix = target_prefix(state.complexity);
        if !block.get_hash().starts_with(prefix.as_str()) {
            debug!(
                "Block rejected. Hash ({}) does not start with: '{prefix}'",
                block.get_hash()
            );
            return Err(RejectedBlock::BelowDifficulty {
                prefix,
                hash: block.get_hash().to_string(),
            });
        }

        let mut rewards = 0;
        for transaction in block.get_transactions() {
            if state.pool.contains(transaction) {
                continue;
            }
            if rewards == 0 && self.is_reward(transaction) {
                rewards += 1;
                continue;
            }
            debug!(
                "Block rejected. Transaction #{} is not present in the pool",
                transaction.get_id()
            );
            return Err(RejectedBlock::UnknownTransaction {
                id: transaction.get_id(),
            });
        }

        let calculated = ProofOfWork::calculate_hash(block, state.tip_hash());
        if block.get_hash() != calculated {
            debug!(
                "Block rejected. Hash ({}) differs from calculated ({calculated})",
                block.get_hash()
            );
            return Err(RejectedBlock::HashMismatch {
                expected: calculated,
                actual: block.get_hash().to_string(),
            });
        }
        Ok(())
    }

    fn notify_closed(&self) {
        let handler = self
            .on_close
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        info!("Ledger reached its capacity of {} blocks and is closed", self.config.capacity);
        if let Some(handler) = handler {
            handler(self);
        }
    }

    /// Recompute every stored block against its predecessor, in chain order
    pub fn verify_chain(&self) -> std::result::Result<(), CorruptedChain> {
        let genesis = Block::genesis();
        let state = self.read_state();
        let mut previous = &genesis;

        for block in state.chain.iter() {
            if block.get_id() != previous.get_id() + 1 {
                let reason = format!(
                    "ID {} does not follow predecessor ID {}",
                    block.get_id(),
                    previous.get_id()
                );
                error!("Chain verification failed at block #{}: {reason}", block.get_id());
                return Err(CorruptedChain {
                    block_id: block.get_id(),
                    reason,
                });
            }

            let calculated = ProofOfWork::calculate_hash(block, previous.get_hash());
            if block.get_hash() != calculated
                || !block
                    .get_hash()
                    .starts_with(target_prefix(block.get_complexity()).as_str())
            {
                let reason = format!(
                    "block hash ({}) differs from calculated ({calculated})",
                    block.get_hash()
                );
                error!("Chain verification failed at block #{}: {reason}", block.get_id());
                return Err(CorruptedChain {
                    block_id: block.get_id(),
                    reason,
                });
            }
            previous = block;
        }
        Ok(())
    }

    /// Balance from confirmed blocks only
    pub fn confirmed_balance(&self, party: &Party) -> i64 {
        self.read_consistent(|state| state.confirmed_balance(party))
    }

    /// Confirmed balance plus the effect of pending pool transactions
    pub fn estimated_balance(&self, party: &Party) -> i64 {
        self.read_consistent(|state| state.estimated_balance(party))
    }

    pub fn highest_transaction_id(&self) -> u64 {
        self.read_consistent(LedgerState::highest_transaction_id)
    }

    pub fn complexity(&self) -> u32 {
        self.read_consistent(|state| state.complexity)
    }

    pub fn target_prefix(&self) -> String {
        target_prefix(self.complexity())
    }

    /// Number of stored blocks, genesis excluded
    pub fn len(&self) -> usize {
        self.read_consistent(|state| state.chain.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tip of the chain, or the genesis sentinel for an empty ledger
    pub fn last_block(&self) -> Block {
        self.read_consistent(LedgerState::tip)
    }

    pub fn block_by_id(&self, id: u64) -> Option<Block> {
        self.read_consistent(|state| state.block_by_id(id))
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.read_consistent(|state| state.chain.clone())
    }

    pub fn pool_len(&self) -> usize {
        self.read_consistent(|state| state.pool.len())
    }

    pub fn pool_contains(&self, id: u64) -> bool {
        self.read_consistent(|state| state.pool.contains_id(id))
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.read_consistent(|state| state.pool.iter().cloned().collect())
    }
}

fn now_millis() -> i64 {
    current_timestamp().unwrap_or_else(|e| {
        warn!("Unable to read the clock: {e}");
        0
    })
}

impl fmt::Display for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read_state();
        for (index, block) in state.chain.iter().enumerate() {
            if index > 0 {
                write!(f, "\n\n")?;
            }
            write!(f, "{block}")?;
        }
        Ok(())
    }
}
