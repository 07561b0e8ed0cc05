use crate::core::Transaction;
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use std::collections::BTreeSet;

/// Merkle root over a block's transaction set.
///
/// Leaves are the per-transaction hashes in id order. Each level hashes
/// adjacent pairs; an odd node is paired with itself (Bitcoin behavior).
pub struct MerkleTree;

impl MerkleTree {
    /// Root hash of a set of transactions; the empty set hashes to SHA256("")
    pub fn transactions_root(transactions: &BTreeSet<Transaction>) -> Vec<u8> {
        let leaves: Vec<Vec<u8>> = transactions.iter().map(Transaction::hash).collect();
        Self::calculate_merkle_root(&leaves)
    }

    /// Hex rendering of `transactions_root`, the form fed into block hashes
    pub fn transactions_root_hex(transactions: &BTreeSet<Transaction>) -> String {
        HEXLOWER.encode(Self::transactions_root(transactions).as_slice())
    }

    pub fn calculate_merkle_root(leaf_hashes: &[Vec<u8>]) -> Vec<u8> {
        if leaf_hashes.is_empty() {
            return sha256_digest(&[]);
        }

        let mut level: Vec<Vec<u8>> = leaf_hashes.to_vec();
        loop {
            level = level
                .chunks(2)
                .map(|pair| {
                    let left = &pair[0];
                    let right = pair.get(1).unwrap_or(left);
                    Self::hash_pair(left, right)
                })
                .collect();
            if level.len() == 1 {
                break;
            }
        }
        level.remove(0)
    }

    fn hash_pair(left: &[u8], right: &[u8]) -> Vec<u8> {
        let mut combined = Vec::with_capacity(left.len() + right.len());
        combined.extend_from_slice(left);
        combined.extend_from_slice(right);
        sha256_digest(&combined)
    }
}
