//! Parties and their keys
//!
//! A `Wallet` holds the ECDSA key pair of one participant and signs the
//! transactions it sends. Its public view, a `Party`, is what transactions
//! reference as sender and recipient.

pub mod wallet;
pub mod wallets;

pub use wallet::{
    address_of, convert_address, hash_pub_key, Party, Wallet,
    ADDRESS_CHECK_SUM_LEN,
};
pub use wallets::Wallets;
