// Entry point of the ledger CLI: runs simulations and inspects saved ledgers
use clap::Parser;
use epoch_chain::{
    format_balances, Blockchain, BlockchainError, Command, LedgerConfig, Opt, Party, Simulation,
    SimulationSettings, SnapshotStore,
};
use log::{error, info, LevelFilter};
use std::collections::BTreeSet;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;

fn main() {
    // Info by default, RUST_LOG takes precedence
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let config = LedgerConfig::load(opt.config.as_deref())?;
    match opt.command {
        Command::Simulate {
            miners,
            seconds,
            interval_ms,
            snapshot,
        } => {
            let ledger = Arc::new(Blockchain::new(config)?);
            let settings = SimulationSettings {
                miners,
                duration: Duration::from_secs(seconds),
                interval: Duration::from_millis(interval_ms),
            };
            let report = Simulation::new(Arc::clone(&ledger), settings)?.run()?;

            println!("{ledger}");
            println!();
            println!("{report}");

            if let Some(dir) = snapshot {
                SnapshotStore::open(&dir)?.save(&ledger.snapshot())?;
                info!("Ledger saved to {}", dir.display());
            }
            if let Err(e) = report.verification {
                return Err(BlockchainError::from(e).into());
            }
        }
        Command::Printchain { snapshot } => {
            let ledger = open_ledger(config, &snapshot)?;
            println!("{ledger}");
        }
        Command::Verifychain { snapshot } => {
            let ledger = open_ledger(config, &snapshot)?;
            ledger.verify_chain().map_err(BlockchainError::from)?;
            println!("Chain of {} blocks is valid", ledger.len());
        }
        Command::Balances { snapshot } => {
            let ledger = open_ledger(config, &snapshot)?;
            let parties: BTreeSet<Party> = ledger
                .blocks()
                .iter()
                .flat_map(|block| block.get_transactions())
                .flat_map(|tx| [tx.get_sender().clone(), tx.get_recipient().clone()])
                .filter(|party| party != ledger.owner())
                .collect();
            let balances: Vec<(Party, i64)> = parties
                .into_iter()
                .map(|party| {
                    let balance = ledger.confirmed_balance(&party);
                    (party, balance)
                })
                .collect();
            println!("{}", format_balances(&balances));
        }
    }
    Ok(())
}

// Restore a ledger from the snapshot stored in `dir`
fn open_ledger(config: LedgerConfig, dir: &Path) -> Result<Blockchain, BlockchainError> {
    let snapshot = SnapshotStore::open(dir)?.load()?.ok_or_else(|| {
        BlockchainError::Database(format!("No saved ledger found in {}", dir.display()))
    })?;
    Blockchain::restore(config, snapshot)
}
