use crate::core::Blockchain;
use crate::error::{BlockchainError, CorruptedChain, Result};
use crate::mining::workload::format_balances;
use crate::mining::{Miner, TransactionProducer};
use crate::wallet::{Party, Wallets};
use log::{error, info};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationSettings {
    pub miners: usize,
    /// Upper bound on the run when the ledger does not close earlier
    pub duration: Duration,
    /// Pause between two rounds of every worker
    pub interval: Duration,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            miners: 3,
            duration: Duration::from_secs(60),
            interval: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug)]
pub struct SimulationReport {
    pub blocks: usize,
    pub closed: bool,
    pub mined: Vec<(Party, usize)>,
    pub offered: usize,
    pub balances: Vec<(Party, i64)>,
    pub verification: std::result::Result<(), CorruptedChain>,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary:")?;
        writeln!(f, "{}", format_balances(&self.balances))?;
        write!(f, "Blocks: {}, transactions offered: {}", self.blocks, self.offered)?;
        match &self.verification {
            Ok(()) => write!(f, "\nChain verified"),
            Err(e) => write!(f, "\nChain verification failed: {e}"),
        }
    }
}

/// Miner threads plus one transaction producer racing on a shared ledger
pub struct Simulation {
    ledger: Arc<Blockchain>,
    wallets: Wallets,
    settings: SimulationSettings,
}

impl Simulation {
    /// Registers one wallet per miner, titled `miner-1`, `miner-2`, ...
    pub fn new(ledger: Arc<Blockchain>, settings: SimulationSettings) -> Result<Simulation> {
        if settings.miners == 0 {
            return Err(BlockchainError::Config(
                "Simulation needs at least one miner".to_string(),
            ));
        }
        let mut wallets = Wallets::new();
        for index in 1..=settings.miners {
            wallets.create_wallet(&format!("miner-{index}"))?;
        }
        Ok(Simulation {
            ledger,
            wallets,
            settings,
        })
    }

    pub fn ledger(&self) -> &Arc<Blockchain> {
        &self.ledger
    }

    /// Run until the ledger closes or the configured duration passes
    pub fn run(self) -> Result<SimulationReport> {
        let Simulation {
            ledger,
            wallets,
            settings,
        } = self;
        let stop = Arc::new(AtomicBool::new(false));
        let (closed_tx, closed_rx) = mpsc::channel();
        ledger.set_on_close(move |_| {
            let _ = closed_tx.send(());
        });

        info!(
            "Starting simulation with {} miners for at most {} seconds",
            settings.miners,
            settings.duration.as_secs()
        );

        let mut miners: Vec<(Party, JoinHandle<usize>)> = Vec::with_capacity(settings.miners);
        for wallet in wallets.iter() {
            let miner = Miner::new(Arc::clone(&ledger), wallet.clone());
            let stop = Arc::clone(&stop);
            let interval = settings.interval;
            let handle = thread::Builder::new()
                .name(wallet.get_title().to_string())
                .spawn(move || miner.run(&stop, interval))?;
            miners.push((wallet.party(), handle));
        }

        let producer = Arc::new(TransactionProducer::new(Arc::clone(&ledger), wallets));
        let producer_handle = {
            let producer = Arc::clone(&producer);
            let stop = Arc::clone(&stop);
            let interval = settings.interval;
            thread::Builder::new()
                .name("transactions".to_string())
                .spawn(move || producer.run(&stop, interval))?
        };

        if ledger.is_closed() || closed_rx.recv_timeout(settings.duration).is_ok() {
            info!("Shutting down...");
        } else {
            info!("Simulation deadline reached, stopping workers");
        }
        stop.store(true, Ordering::Release);

        let mined = miners
            .into_iter()
            .map(|(party, handle)| {
                let count = join_worker(handle, party.get_title());
                (party, count)
            })
            .collect();
        let offered = join_worker(producer_handle, "transactions");

        Ok(SimulationReport {
            blocks: ledger.len(),
            closed: ledger.is_closed(),
            mined,
            offered,
            balances: producer.balances(),
            verification: ledger.verify_chain(),
        })
    }
}

fn join_worker(handle: JoinHandle<usize>, name: &str) -> usize {
    handle.join().unwrap_or_else(|_| {
        error!("Worker {name} panicked");
        0
    })
}
