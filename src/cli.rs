//! Command-line surface

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "axial", version, about = "Axial: plan ledger, approval gates, task routing and forks")]
pub struct Cli {
    /// Config file (default: $AXIAL_CONFIG, then <data_dir>/axial.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Route a task to an executor and print its output
    Route(RouteArgs),
    /// Fork management through the daemon
    Git {
        #[command(subcommand)]
        command: GitCommand,
    },
    /// Launch the desktop UI
    Ui,
    /// Run the HTTP daemon in the foreground
    Daemon {
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(short, long)]
        bind: Option<String>,
        /// Also write logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Submit plans to the ledger
    Plan {
        #[command(subcommand)]
        command: PlanCommand,
    },
    /// Approve (or reject) a pending gate
    Approve {
        #[arg(long)]
        gate: String,
        #[arg(long)]
        reject: bool,
    },
    /// Approval gates
    Gate {
        #[command(subcommand)]
        command: GateCommand,
    },
    /// Inspect the plan ledger
    Ledger {
        #[command(subcommand)]
        command: LedgerCommand,
    },
}

#[derive(Args, Debug)]
pub struct RouteArgs {
    #[arg(short, long)]
    pub task: String,
    /// Routing strategy (static, capability, local_first, chain)
    #[arg(short, long)]
    pub strategy: Option<String>,
    /// Print which executor was chosen and why
    #[arg(long)]
    pub explain: bool,
    /// Choose an executor without running it
    #[arg(long)]
    pub dry_run: bool,
    /// Route through the running daemon instead of in-process
    #[arg(long)]
    pub via_daemon: bool,
}

#[derive(Subcommand, Debug)]
pub enum GitCommand {
    /// Create an isolated fork
    Fork {
        #[arg(long)]
        id: String,
    },
    /// Discard a fork
    Close {
        #[arg(long)]
        id: String,
    },
    /// List forks
    List,
}

#[derive(Subcommand, Debug)]
pub enum PlanCommand {
    #[command(group(ArgGroup::new("source").required(true).args(["file", "json"])))]
    Submit {
        /// Read the plan from a JSON file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Plan JSON given inline
        #[arg(long)]
        json: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum GateCommand {
    Create {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    List {
        #[arg(long)]
        pending: bool,
    },
    /// Block until a gate is approved or rejected
    Wait {
        #[arg(long)]
        id: String,
        /// Give up after this many seconds (the daemon caps it at 300)
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// Recompute the hash chain
    Verify,
    /// Copy the ledger and a manifest (entry count, root hash) into a directory
    Export {
        #[arg(long)]
        out: PathBuf,
    },
    List {
        /// Only entries whose payload contains this text
        #[arg(short, long)]
        query: Option<String>,
    },
}
