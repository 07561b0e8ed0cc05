use crate::error::{BlockchainError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

const CAPACITY_KEY: &str = "EPOCH_CHAIN_CAPACITY";
const INITIAL_COMPLEXITY_KEY: &str = "EPOCH_CHAIN_INITIAL_COMPLEXITY";
const MIN_COMPLEXITY_KEY: &str = "EPOCH_CHAIN_MIN_COMPLEXITY";
const MAX_COMPLEXITY_KEY: &str = "EPOCH_CHAIN_MAX_COMPLEXITY";
const REWARD_KEY: &str = "EPOCH_CHAIN_REWARD";

// A SHA-256 digest renders to 64 hex characters
const HASH_HEX_LEN: u32 = 64;

/// Consensus constants of one ledger instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Number of blocks after which the ledger closes for good
    pub capacity: usize,
    pub initial_complexity: u32,
    pub min_complexity: u32,
    pub max_complexity: u32,
    /// Blocks arriving faster than this raise the complexity
    pub min_block_gap_ms: u64,
    /// Blocks arriving slower than this lower the complexity
    pub max_block_gap_ms: u64,
    /// Amount paid by the ledger owner to the miner of each block
    pub reward: i64,
    pub owner_title: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            capacity: 15,
            initial_complexity: 3,
            min_complexity: 0,
            max_complexity: 5,
            min_block_gap_ms: 5_000,
            max_block_gap_ms: 30_000,
            reward: 100,
            owner_title: String::from("BLOCKCHAIN"),
        }
    }
}

impl LedgerConfig {
    /// Defaults, then the optional TOML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<LedgerConfig> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => LedgerConfig::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<LedgerConfig> {
        let text = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<LedgerConfig> {
        let config: LedgerConfig = toml::from_str(text)?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(capacity) = read_env(CAPACITY_KEY)? {
            self.capacity = capacity;
        }
        if let Some(complexity) = read_env(INITIAL_COMPLEXITY_KEY)? {
            self.initial_complexity = complexity;
        }
        if let Some(complexity) = read_env(MIN_COMPLEXITY_KEY)? {
            self.min_complexity = complexity;
        }
        if let Some(complexity) = read_env(MAX_COMPLEXITY_KEY)? {
            self.max_complexity = complexity;
        }
        if let Some(reward) = read_env(REWARD_KEY)? {
            self.reward = reward;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(BlockchainError::Config(
                "Capacity must be at least one block".to_string(),
            ));
        }
        if self.min_complexity > self.max_complexity {
            return Err(BlockchainError::Config(format!(
                "Minimum complexity {} exceeds maximum {}",
                self.min_complexity, self.max_complexity
            )));
        }
        if self.max_complexity > HASH_HEX_LEN {
            return Err(BlockchainError::Config(format!(
                "Maximum complexity {} exceeds hash length {HASH_HEX_LEN}",
                self.max_complexity
            )));
        }
        if !(self.min_complexity..=self.max_complexity).contains(&self.initial_complexity) {
            return Err(BlockchainError::Config(format!(
                "Initial complexity {} is outside [{}, {}]",
                self.initial_complexity, self.min_complexity, self.max_complexity
            )));
        }
        if self.min_block_gap_ms > self.max_block_gap_ms {
            return Err(BlockchainError::Config(format!(
                "Minimum block gap {}ms exceeds maximum {}ms",
                self.min_block_gap_ms, self.max_block_gap_ms
            )));
        }
        if self.reward <= 0 {
            return Err(BlockchainError::Config(
                "Reward must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => {
            debug!("Config override from environment: {key}={raw}");
            raw.trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| BlockchainError::Config(format!("Invalid value for {key}: {raw}")))
        }
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            warn!("Ignoring non-unicode value of {key}");
            Ok(None)
        }
    }
}
