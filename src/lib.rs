//! # Epoch Chain - a single-process proof-of-work ledger
//!
//! Notes for when I come back to this code.
//!
//! ## What It Does
//! - **Shared Ledger**: one `Blockchain` owns the chain, the pending pool and
//!   the current complexity; every mutation happens under a single write lock
//! - **Signed Transactions**: ECDSA P-256 signatures bound to Base58Check addresses
//! - **Epoch Challenges**: miners get an immutable work order plus a flag that
//!   flips when anyone wins the epoch, so losers stop early
//! - **Difficulty Adjustment**: complexity moves one step per block to keep block
//!   times inside a configured band
//! - **Accounting**: confirmed and estimated balances folded from transactions
//! - **Snapshots**: a sled store keeps a ledger between runs
//!
//! ## How The Code Is Organized
//! - `core/`: blocks, transactions, challenges, proof-of-work, the ledger itself
//! - `mining/`: miner workers, the random transaction producer, the simulation
//! - `wallet/`: key pairs, parties and addresses
//! - `storage/`: memory pool and snapshot persistence
//! - `config/`: ledger constants from defaults, TOML and environment
//! - `utils/`: hashing, signing and serialization helpers
//! - `cli/`: command-line interface
//!
//! ## Where To Start
//! 1. `core/blockchain.rs` for admission rules and the locking scheme
//! 2. `core/proof_of_work.rs` for the nonce search
//! 3. `mining/simulation.rs` for how the threads are wired together

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod mining;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::LedgerConfig;
pub use core::{
    target_prefix, transactions_balance, Block, Blockchain, Challenge, DifficultyAdjustment,
    EpochFlag, MerkleTree, ProofOfWork, Transaction, GENESIS_HASH,
};
pub use error::{
    BlockchainError, ChallengeExpired, Closed, CorruptedChain, MiningError, RejectedBlock,
    RejectedTransaction, Result,
};
pub use mining::{
    format_balances, Miner, Simulation, SimulationReport, SimulationSettings,
    TransactionProducer,
};
pub use storage::{LedgerSnapshot, MemoryPool, SnapshotStore};
pub use utils::{
    base58_encode, current_timestamp, ecdsa_p256_sha256_sign_digest,
    ecdsa_p256_sha256_sign_verify, hex_digest, new_key_pair, ripemd160_digest, sha256_digest,
};
pub use wallet::{
    address_of, convert_address, hash_pub_key, Party, Wallet, Wallets,
    ADDRESS_CHECK_SUM_LEN,
};
