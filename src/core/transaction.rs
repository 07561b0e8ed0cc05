// A transaction is a signed transfer of an amount between two parties.
// Once signed it never changes; the ledger only ever moves it from the pool
// into a block.

use crate::error::Result;
use crate::utils::{ecdsa_p256_sha256_sign_verify, sha256_digest};
use crate::wallet::{address_of, Party, Wallet};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    id: u64,
    sender: Party,
    recipient: Party,
    amount: i64,
    signature: Vec<u8>,
    public_key: Vec<u8>,
}

impl Transaction {
    /// Build a transaction and sign its digest with the sender's wallet
    pub fn new_signed(
        id: u64,
        sender: &Wallet,
        recipient: Party,
        amount: i64,
    ) -> Result<Transaction> {
        let sender_party = sender.party();
        let digest = Self::digest_of(id, &sender_party, &recipient, amount);
        let signature = sender.sign(digest.as_bytes())?;

        Ok(Transaction {
            id,
            sender: sender_party,
            recipient,
            amount,
            signature,
            public_key: sender.get_public_key().to_vec(),
        })
    }

    /// Assemble a transaction from raw parts without signing or checking it
    pub fn from_parts(
        id: u64,
        sender: Party,
        recipient: Party,
        amount: i64,
        signature: Vec<u8>,
        public_key: Vec<u8>,
    ) -> Transaction {
        Transaction {
            id,
            sender,
            recipient,
            amount,
            signature,
            public_key,
        }
    }

    fn digest_of(id: u64, sender: &Party, recipient: &Party, amount: i64) -> String {
        format!(
            "{id}:{}:{}:{amount}",
            sender.get_address(),
            recipient.get_address()
        )
    }

    /// Canonical string the signature covers
    pub fn digest(&self) -> String {
        Self::digest_of(self.id, &self.sender, &self.recipient, self.amount)
    }

    /// The signature must verify over the digest and the key must belong to the sender
    pub fn verify_signature(&self) -> bool {
        if address_of(self.public_key.as_slice()) != self.sender.get_address() {
            log::debug!(
                "Transaction #{} public key does not belong to {}",
                self.id,
                self.sender
            );
            return false;
        }
        ecdsa_p256_sha256_sign_verify(
            self.public_key.as_slice(),
            self.signature.as_slice(),
            self.digest().as_bytes(),
        )
    }

    /// Leaf hash used for the block's transaction root
    pub fn hash(&self) -> Vec<u8> {
        let mut data = self.digest().into_bytes();
        data.extend(self.signature.as_slice());
        data.extend(self.public_key.as_slice());
        sha256_digest(data.as_slice())
    }

    pub fn get_id(&self) -> u64 {
        self.id
    }

    pub fn get_sender(&self) -> &Party {
        &self.sender
    }

    pub fn get_recipient(&self) -> &Party {
        &self.recipient
    }

    pub fn get_amount(&self) -> i64 {
        self.amount
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }
}

// Ordered by id first; the remaining fields only break ties so that the
// ordering agrees with structural equality.
impl Ord for Transaction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.sender.cmp(&other.sender))
            .then_with(|| self.recipient.cmp(&other.recipient))
            .then_with(|| self.amount.cmp(&other.amount))
            .then_with(|| self.signature.cmp(&other.signature))
            .then_with(|| self.public_key.cmp(&other.public_key))
    }
}

impl PartialOrd for Transaction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{}: {} => {}, {}",
            self.id,
            self.sender.get_title(),
            self.recipient.get_title(),
            self.amount
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallets() -> (Wallet, Wallet) {
        (Wallet::new("alice").unwrap(), Wallet::new("bob").unwrap())
    }

    #[test]
    fn test_signed_transaction_verifies() {
        let (alice, bob) = wallets();
        let tx = Transaction::new_signed(1, &alice, bob.party(), 10).unwrap();

        assert!(tx.verify_signature());
        assert_eq!(tx.get_sender(), &alice.party());
        assert_eq!(tx.get_recipient(), &bob.party());
        assert_eq!(tx.to_string(), "#1: alice => bob, 10");
    }

    #[test]
    fn test_tampered_amount_fails_verification() {
        let (alice, bob) = wallets();
        let tx = Transaction::new_signed(1, &alice, bob.party(), 10).unwrap();

        let forged = Transaction::from_parts(
            tx.get_id(),
            tx.get_sender().clone(),
            tx.get_recipient().clone(),
            1_000,
            tx.get_signature().to_vec(),
            tx.get_public_key().to_vec(),
        );
        assert!(!forged.verify_signature());
    }

    #[test]
    fn test_foreign_key_fails_verification() {
        let (alice, bob) = wallets();
        // Bob signs a transfer claiming to come from Alice
        let digest = Transaction::digest_of(5, &alice.party(), &bob.party(), 10);
        let signature = bob.sign(digest.as_bytes()).unwrap();
        let forged = Transaction::from_parts(
            5,
            alice.party(),
            bob.party(),
            10,
            signature,
            bob.get_public_key().to_vec(),
        );

        assert!(!forged.verify_signature());
    }

    #[test]
    fn test_ordering_follows_id() {
        let (alice, bob) = wallets();
        let late = Transaction::new_signed(7, &alice, bob.party(), 1).unwrap();
        let early = Transaction::new_signed(3, &bob, alice.party(), 50).unwrap();

        assert!(early < late);
        let mut sorted = vec![late.clone(), early.clone()];
        sorted.sort();
        assert_eq!(sorted, vec![early, late]);
    }

    #[test]
    fn test_hash_is_stable_per_transaction() {
        let (alice, bob) = wallets();
        let tx = Transaction::new_signed(1, &alice, bob.party(), 10).unwrap();
        let other = Transaction::new_signed(2, &alice, bob.party(), 10).unwrap();

        assert_eq!(tx.hash(), tx.clone().hash());
        assert_ne!(tx.hash(), other.hash());
    }
}
