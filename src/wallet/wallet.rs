use crate::error::{BlockchainError, Result};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
use serde::{Deserialize, Serialize};
use std::fmt;

const VERSION: u8 = 0x00;
pub const ADDRESS_CHECK_SUM_LEN: usize = 4;

/// A named participant of the ledger, identified by its key-derived address
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
pub struct Party {
    title: String,
    address: String,
}

impl Party {
    pub fn new(title: impl Into<String>, address: impl Into<String>) -> Party {
        Party {
            title: title.into(),
            address: address.into(),
        }
    }

    pub fn get_title(&self) -> &str {
        self.title.as_str()
    }

    pub fn get_address(&self) -> &str {
        self.address.as_str()
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Key pair owned by one party; signs the transactions that party sends
#[derive(Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Wallet {
    title: String,
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("title", &self.title)
            .field("address", &self.get_address())
            .finish_non_exhaustive()
    }
}

impl Wallet {
    pub fn new(title: impl Into<String>) -> Result<Wallet> {
        let pkcs8 = crate::utils::new_key_pair()?;
        let rng = SystemRandom::new();
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
                .map_err(|e| {
                    BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
                })?;
        let public_key = key_pair.public_key().as_ref().to_vec();
        Ok(Wallet {
            title: title.into(),
            pkcs8,
            public_key,
        })
    }

    pub fn get_title(&self) -> &str {
        self.title.as_str()
    }

    pub fn get_address(&self) -> String {
        convert_address(hash_pub_key(self.public_key.as_slice()).as_slice())
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn party(&self) -> Party {
        Party::new(self.title.clone(), self.get_address())
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        crate::utils::ecdsa_p256_sha256_sign_digest(self.pkcs8.as_slice(), message)
    }
}

pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    let pub_key_sha256 = crate::utils::sha256_digest(pub_key);
    crate::utils::ripemd160_digest(pub_key_sha256.as_slice())
}

/// Address a public key signs for
pub fn address_of(pub_key: &[u8]) -> String {
    convert_address(hash_pub_key(pub_key).as_slice())
}

fn checksum(payload: &[u8]) -> Vec<u8> {
    let first_sha = crate::utils::sha256_digest(payload);
    let second_sha = crate::utils::sha256_digest(first_sha.as_slice());
    second_sha[0..ADDRESS_CHECK_SUM_LEN].to_vec()
}

pub fn convert_address(pub_hash_key: &[u8]) -> String {
    let mut payload: Vec<u8> = vec![VERSION];
    payload.extend(pub_hash_key);
    let checksum = checksum(payload.as_slice());
    payload.extend(checksum.as_slice());
    // version + pub_key_hash + checksum
    crate::utils::base58_encode(payload.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_address_is_bound_to_key() {
        let wallet = Wallet::new("alice").unwrap();
        let address = wallet.get_address();

        assert_eq!(address_of(wallet.get_public_key()), address);
        assert_eq!(wallet.party().get_address(), address);
        assert_eq!(wallet.party().get_title(), "alice");
    }

    #[test]
    fn test_distinct_wallets_have_distinct_addresses() {
        let first = Wallet::new("m1").unwrap();
        let second = Wallet::new("m1").unwrap();
        assert_ne!(first.get_address(), second.get_address());
        assert_ne!(first.party(), second.party());
    }

    #[test]
    fn test_address_carries_version_and_checksum() {
        let wallet = Wallet::new("bob").unwrap();
        let pub_key_hash = hash_pub_key(wallet.get_public_key());
        let payload = bs58::decode(wallet.get_address()).into_vec().unwrap();

        assert_eq!(payload.len(), 1 + pub_key_hash.len() + ADDRESS_CHECK_SUM_LEN);
        assert_eq!(payload[0], VERSION);
        assert_eq!(&payload[1..=pub_key_hash.len()], pub_key_hash.as_slice());
        assert_eq!(
            &payload[payload.len() - ADDRESS_CHECK_SUM_LEN..],
            checksum(&payload[..=pub_key_hash.len()]).as_slice()
        );
    }
}
