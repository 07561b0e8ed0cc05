use crate::error::Result;
use crate::wallet::{Party, Wallet};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// In-memory registry of the parties taking part in a run, keyed by address.
///
/// Registration order is kept so random picks and summaries are stable for
/// a given set of wallets.
#[derive(Default)]
pub struct Wallets {
    wallets: HashMap<String, Wallet>,
    order: Vec<String>,
}

impl Wallets {
    pub fn new() -> Wallets {
        Wallets::default()
    }

    pub fn create_wallet(&mut self, title: &str) -> Result<String> {
        let wallet = Wallet::new(title)?;
        let address = wallet.get_address();
        self.add_wallet(wallet);
        Ok(address)
    }

    pub fn add_wallet(&mut self, wallet: Wallet) {
        let address = wallet.get_address();
        if self.wallets.insert(address.clone(), wallet).is_none() {
            self.order.push(address);
        }
    }

    pub fn parties(&self) -> Vec<Party> {
        self.iter().map(Wallet::party).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Wallet> {
        self.order
            .iter()
            .filter_map(|address| self.wallets.get(address))
    }

    pub fn random_wallet<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Wallet> {
        self.order
            .choose(rng)
            .and_then(|address| self.wallets.get(address))
    }

    /// Up to `amount` distinct wallets in random order
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, amount: usize) -> Vec<&Wallet> {
        self.order
            .choose_multiple(rng, amount)
            .filter_map(|address| self.wallets.get(address))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_wallets_keeps_registration_order() {
        let mut wallets = Wallets::new();
        let first = wallets.create_wallet("m1").unwrap();
        let second = wallets.create_wallet("m2").unwrap();

        assert_eq!(wallets.len(), 2);
        let parties = wallets.parties();
        assert_eq!(parties[0].get_address(), first);
        assert_eq!(parties[1].get_address(), second);
        assert_eq!(parties[1].get_title(), "m2");
    }

    #[test]
    fn test_random_wallet_on_empty_registry() {
        let wallets = Wallets::new();
        assert!(wallets.is_empty());
        assert!(wallets.random_wallet(&mut rand::thread_rng()).is_none());
    }
}
