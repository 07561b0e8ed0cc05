use crate::core::{Block, Blockchain, ProofOfWork};
use crate::error::MiningError;
use crate::wallet::{Party, Wallet};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A worker that repeatedly asks the ledger for work and offers what it mines
pub struct Miner {
    ledger: Arc<Blockchain>,
    wallet: Wallet,
}

impl Miner {
    pub fn new(ledger: Arc<Blockchain>, wallet: Wallet) -> Miner {
        Miner { ledger, wallet }
    }

    pub fn get_title(&self) -> &str {
        self.wallet.get_title()
    }

    pub fn party(&self) -> Party {
        self.wallet.party()
    }

    /// One round: challenge, search, offer
    pub fn generate_block(&self) -> Result<Block, MiningError> {
        self.round(None)
    }

    fn round(&self, stop: Option<&AtomicBool>) -> Result<Block, MiningError> {
        let challenge = self.ledger.get_challenge(&self.party())?;
        let pow = ProofOfWork::new_proof_of_work(&challenge);
        let block = match stop {
            Some(stop) => pow.run_until(self.get_title(), stop)?,
            None => pow.run(self.get_title())?,
        };
        self.ledger.offer_block(block.clone())?;
        Ok(block)
    }

    /// Mine until the ledger closes or `stop` is raised, pausing `interval`
    /// between rounds. Returns the number of accepted blocks.
    pub fn run(&self, stop: &AtomicBool, interval: Duration) -> usize {
        let mut mined = 0;
        while !stop.load(Ordering::Acquire) && !self.ledger.is_closed() {
            match self.round(Some(stop)) {
                Ok(block) => {
                    mined += 1;
                    debug!("{} mined block #{}", self.get_title(), block.get_id());
                }
                Err(MiningError::Closed) => break,
                Err(MiningError::Expired(e)) => debug!("Challenge expired: {e}"),
                Err(e) => debug!("Unable to generate block: {e}"),
            }
            thread::sleep(interval);
        }
        info!("{} stopped after mining {mined} blocks", self.get_title());
        mined
    }
}
