//! Utility functions and helpers
//!
//! Hashing, signing, encoding and serialization helpers shared by the ledger,
//! the wallets and the snapshot store.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    base58_encode, current_timestamp, ecdsa_p256_sha256_sign_digest,
    ecdsa_p256_sha256_sign_verify, hex_digest, new_key_pair, ripemd160_digest, sha256_digest,
};

pub use serialization::{deserialize, serialize};
