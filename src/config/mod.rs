//! Configuration management
//!
//! This module holds the consensus constants of a ledger: capacity, difficulty
//! bounds, the block-time band driving difficulty adjustment, and the mining
//! reward. Values come from defaults, an optional TOML file and environment
//! overrides, in that order.

pub mod settings;

pub use settings::LedgerConfig;
