use crate::core::{Blockchain, Transaction};
use crate::error::Result;
use crate::wallet::{Party, Wallet, Wallets};
use log::{debug, info};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// Distinct parties checked for something to spend
const MAX_RETRIES: usize = 10;

/// Generates random transfers between registered parties
pub struct TransactionProducer {
    ledger: Arc<Blockchain>,
    wallets: Wallets,
}

impl TransactionProducer {
    pub fn new(ledger: Arc<Blockchain>, wallets: Wallets) -> TransactionProducer {
        TransactionProducer { ledger, wallets }
    }

    /// Pick a party with a positive estimated balance and send half of it to
    /// someone else. `Ok(None)` when there is nothing to send.
    pub fn offer_random_transaction<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Option<Transaction>> {
        if self.ledger.is_closed() || self.wallets.len() < 2 {
            return Ok(None);
        }

        let Some((sender, balance)) = self.find_rich_party(rng) else {
            return Ok(None);
        };
        debug!("Verified {}'s balance: {balance} coins", sender.get_title());

        let recipient = loop {
            match self.wallets.random_wallet(rng) {
                Some(wallet) if wallet.get_address() != sender.get_address() => {
                    break wallet.party()
                }
                _ => continue,
            }
        };

        let amount = (balance + 1) / 2;
        let transaction = Transaction::new_signed(
            self.ledger.next_transaction_id(),
            sender,
            recipient,
            amount,
        )?;
        debug!("New transaction: {transaction}");
        self.ledger.offer_transaction(transaction.clone())?;
        Ok(Some(transaction))
    }

    fn find_rich_party<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(&Wallet, i64)> {
        self.wallets
            .sample(rng, MAX_RETRIES)
            .into_iter()
            .find_map(|wallet| {
                let balance = self.ledger.estimated_balance(&wallet.party());
                (balance > 0).then_some((wallet, balance))
            })
    }

    /// Offer a transaction every `interval` until the ledger closes or `stop` is raised
    pub fn run(&self, stop: &AtomicBool, interval: Duration) -> usize {
        let mut rng = rand::thread_rng();
        let mut offered = 0;
        while !stop.load(Ordering::Acquire) && !self.ledger.is_closed() {
            match self.offer_random_transaction(&mut rng) {
                Ok(Some(_)) => offered += 1,
                Ok(None) => {}
                Err(e) => debug!("Unable to generate and offer a random transaction: {e}"),
            }
            thread::sleep(interval);
        }
        info!("Transaction producer stopped after {offered} transactions");
        offered
    }

    /// Confirmed balance of every registered party, in registration order
    pub fn balances(&self) -> Vec<(Party, i64)> {
        self.wallets
            .parties()
            .into_iter()
            .map(|party| {
                let balance = self.ledger.confirmed_balance(&party);
                (party, balance)
            })
            .collect()
    }
}

/// `title = balance` per line
pub fn format_balances(balances: &[(Party, i64)]) -> String {
    balances
        .iter()
        .map(|(party, balance)| format!("{} = {balance}", party.get_title()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::{create_test_ledger, fund_party};

    fn registry(titles: &[&str]) -> Wallets {
        let mut wallets = Wallets::new();
        for title in titles {
            wallets.create_wallet(title).unwrap();
        }
        wallets
    }

    #[test]
    fn test_nothing_to_send_without_funds() {
        let ledger = Arc::new(create_test_ledger(5));
        let producer = TransactionProducer::new(Arc::clone(&ledger), registry(&["a", "b"]));

        let offered = producer
            .offer_random_transaction(&mut rand::thread_rng())
            .unwrap();
        assert!(offered.is_none());
        assert_eq!(ledger.pool_len(), 0);
    }

    #[test]
    fn test_rich_party_sends_half_of_its_balance() {
        let ledger = Arc::new(create_test_ledger(5));
        let wallets = registry(&["a", "b", "c"]);
        let rich = wallets.iter().next().unwrap().clone();
        fund_party(&ledger, &rich);
        let producer = TransactionProducer::new(Arc::clone(&ledger), wallets);

        let transaction = producer
            .offer_random_transaction(&mut rand::thread_rng())
            .unwrap()
            .unwrap();

        assert_eq!(transaction.get_sender(), &rich.party());
        assert_ne!(transaction.get_recipient(), &rich.party());
        assert_eq!(transaction.get_amount(), 50);
        assert!(ledger.pool_contains(transaction.get_id()));
        assert_eq!(ledger.estimated_balance(&rich.party()), 50);
    }

    #[test]
    fn test_format_balances() {
        let wallets = registry(&["a", "b"]);
        let ledger = Arc::new(create_test_ledger(5));
        fund_party(&ledger, wallets.iter().nth(1).unwrap());
        let producer = TransactionProducer::new(ledger, wallets);

        assert_eq!(format_balances(&producer.balances()), "a = 0\nb = 100");
    }
}
