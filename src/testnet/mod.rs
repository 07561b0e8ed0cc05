//! Test helpers shared by the unit tests
//!
//! Small ledgers with an easy, constant difficulty plus shortcuts for funding
//! a party and mining the next block.

pub mod test_utils;

pub use test_utils::*;
