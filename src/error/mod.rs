//! Error handling for the ledger
//!
//! `BlockchainError` is the crate-wide error used by configuration, storage and
//! the binary. Admission and verification failures have their own typed errors
//! so callers can match on the exact rejection reason; each of them converts
//! into `BlockchainError` for `?` propagation.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Crate-wide error type
#[derive(Debug, Clone)]
pub enum BlockchainError {
    /// Database-related errors
    Database(String),
    /// Cryptographic operation errors
    Crypto(String),
    /// Configuration errors
    Config(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Transaction refused by the ledger
    Transaction(RejectedTransaction),
    /// Block refused by the ledger
    InvalidBlock(RejectedBlock),
    /// Proof-of-work abandoned because another miner won the epoch
    ChallengeExpired(ChallengeExpired),
    /// Ledger reached its capacity
    Closed,
    /// Stored chain failed hash-chain verification
    CorruptedChain(CorruptedChain),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::Database(msg) => write!(f, "Database error: {msg}"),
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::Transaction(reason) => write!(f, "Transaction rejected: {reason}"),
            BlockchainError::InvalidBlock(reason) => write!(f, "Block rejected: {reason}"),
            BlockchainError::ChallengeExpired(e) => write!(f, "{e}"),
            BlockchainError::Closed => write!(f, "{Closed}"),
            BlockchainError::CorruptedChain(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

/// Reasons a transaction is refused admission to the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectedTransaction {
    Closed,
    Duplicate,
    StaleId,
    InsufficientFunds { required: i64, available: i64 },
    BadSignature,
    SelfTransfer,
    NegativeAmount,
}

impl fmt::Display for RejectedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectedTransaction::Closed => write!(f, "ledger is closed"),
            RejectedTransaction::Duplicate => {
                write!(f, "transaction with such ID is already present")
            }
            RejectedTransaction::StaleId => write!(
                f,
                "transaction ID is equal to or lower than the highest confirmed ID"
            ),
            RejectedTransaction::InsufficientFunds {
                required,
                available,
            } => write!(
                f,
                "insufficient funds: required {required}, available {available}"
            ),
            RejectedTransaction::BadSignature => write!(f, "signature is invalid"),
            RejectedTransaction::SelfTransfer => write!(f, "sender and recipient are the same"),
            RejectedTransaction::NegativeAmount => write!(f, "amount must not be negative"),
        }
    }
}

impl std::error::Error for RejectedTransaction {}

/// Reasons an offered block is refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectedBlock {
    Closed,
    BadId { expected: u64, actual: u64 },
    BelowDifficulty { prefix: String, hash: String },
    UnknownTransaction { id: u64 },
    HashMismatch { expected: String, actual: String },
}

impl fmt::Display for RejectedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectedBlock::Closed => write!(f, "ledger is closed"),
            RejectedBlock::BadId { expected, actual } => {
                write!(f, "block has invalid ID {actual}, expected {expected}")
            }
            RejectedBlock::BelowDifficulty { prefix, hash } => write!(
                f,
                "block hash {hash} does not start with required prefix '{prefix}'"
            ),
            RejectedBlock::UnknownTransaction { id } => {
                write!(f, "transaction #{id} is not present in the pool")
            }
            RejectedBlock::HashMismatch { expected, actual } => write!(
                f,
                "block hash {actual} differs from calculated {expected}"
            ),
        }
    }
}

impl std::error::Error for RejectedBlock {}

/// The epoch a challenge belonged to has already been won
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeExpired {
    pub block_id: u64,
}

impl fmt::Display for ChallengeExpired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "challenge for block #{} is finished by someone else",
            self.block_id
        )
    }
}

impl std::error::Error for ChallengeExpired {}

/// The ledger reached its capacity and accepts no more work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closed;

impl fmt::Display for Closed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ledger is closed")
    }
}

impl std::error::Error for Closed {}

/// A stored block no longer matches its recorded hash chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptedChain {
    pub block_id: u64,
    pub reason: String,
}

impl fmt::Display for CorruptedChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "corrupted chain at block #{}: {}", self.block_id, self.reason)
    }
}

impl std::error::Error for CorruptedChain {}

/// Outcome of a mining round that produced no accepted block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningError {
    /// The ledger closed before or during the round
    Closed,
    /// Another miner won the epoch first
    Expired(ChallengeExpired),
    /// The ledger refused the mined block
    Rejected(RejectedBlock),
}

impl fmt::Display for MiningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiningError::Closed => write!(f, "{Closed}"),
            MiningError::Expired(e) => write!(f, "{e}"),
            MiningError::Rejected(reason) => write!(f, "block rejected: {reason}"),
        }
    }
}

impl std::error::Error for MiningError {}

impl From<Closed> for MiningError {
    fn from(_: Closed) -> Self {
        MiningError::Closed
    }
}

impl From<ChallengeExpired> for MiningError {
    fn from(err: ChallengeExpired) -> Self {
        MiningError::Expired(err)
    }
}

impl From<RejectedBlock> for MiningError {
    fn from(err: RejectedBlock) -> Self {
        match err {
            RejectedBlock::Closed => MiningError::Closed,
            other => MiningError::Rejected(other),
        }
    }
}

impl From<MiningError> for BlockchainError {
    fn from(err: MiningError) -> Self {
        match err {
            MiningError::Closed => BlockchainError::Closed,
            MiningError::Expired(e) => BlockchainError::ChallengeExpired(e),
            MiningError::Rejected(reason) => BlockchainError::InvalidBlock(reason),
        }
    }
}

impl From<RejectedTransaction> for BlockchainError {
    fn from(err: RejectedTransaction) -> Self {
        BlockchainError::Transaction(err)
    }
}

impl From<RejectedBlock> for BlockchainError {
    fn from(err: RejectedBlock) -> Self {
        BlockchainError::InvalidBlock(err)
    }
}

impl From<ChallengeExpired> for BlockchainError {
    fn from(err: ChallengeExpired) -> Self {
        BlockchainError::ChallengeExpired(err)
    }
}

impl From<Closed> for BlockchainError {
    fn from(_: Closed) -> Self {
        BlockchainError::Closed
    }
}

impl From<CorruptedChain> for BlockchainError {
    fn from(err: CorruptedChain) -> Self {
        BlockchainError::CorruptedChain(err)
    }
}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}
