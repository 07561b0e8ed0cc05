use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "epoch-chain")]
pub struct Opt {
    /// TOML file with ledger settings; environment variables override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "simulate", about = "Run miners and random transfers until the ledger closes")]
    Simulate {
        #[arg(long, default_value_t = 3, help = "Number of miner threads")]
        miners: usize,
        #[arg(long, default_value_t = 60, help = "Upper bound on the run, in seconds")]
        seconds: u64,
        #[arg(long = "interval-ms", default_value_t = 1000, help = "Pause between worker rounds")]
        interval_ms: u64,
        #[arg(long, help = "Directory to save the final ledger snapshot into")]
        snapshot: Option<PathBuf>,
    },
    #[command(name = "printchain", about = "Print all blocks of a saved ledger")]
    Printchain {
        #[arg(long, help = "Snapshot directory")]
        snapshot: PathBuf,
    },
    #[command(name = "verifychain", about = "Verify the hash chain of a saved ledger")]
    Verifychain {
        #[arg(long, help = "Snapshot directory")]
        snapshot: PathBuf,
    },
    #[command(name = "balances", about = "Print confirmed balances of a saved ledger")]
    Balances {
        #[arg(long, help = "Snapshot directory")]
        snapshot: PathBuf,
    },
}
