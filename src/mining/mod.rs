//! Mining workers
//!
//! Miners fetch a challenge, search for a qualifying nonce outside the ledger
//! lock and offer the block back. A transaction producer keeps the pool busy
//! with random transfers, and `Simulation` runs them all on threads against
//! one shared ledger.

pub mod miner;
pub mod simulation;
pub mod workload;

pub use miner::Miner;
pub use simulation::{Simulation, SimulationReport, SimulationSettings};
pub use workload::{format_balances, TransactionProducer};
