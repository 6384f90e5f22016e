use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use stet_core::{ConflictStatus, Strategy};

#[derive(Parser)]
#[command(name = "stet")]
#[command(about = "Detect, inspect, and resolve write conflicts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the conflict state file
    #[arg(long, global = true, value_name = "PATH")]
    pub state_path: Option<PathBuf>,

    /// Optional path to the resolver config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a failed version check between two snapshots
    Report {
        /// Snapshot the writer holds (JSON)
        #[arg(long, value_name = "FILE")]
        local: PathBuf,
        /// Snapshot currently persisted (JSON)
        #[arg(long, value_name = "FILE")]
        server: PathBuf,
    },
    /// Check whether a write of the local snapshot may proceed
    Check {
        /// Snapshot the writer holds (JSON)
        #[arg(long, value_name = "FILE")]
        local: PathBuf,
        /// Snapshot currently persisted (JSON)
        #[arg(long, value_name = "FILE")]
        server: PathBuf,
    },
    /// List recorded conflicts
    #[command(alias = "ls")]
    List {
        /// Which conflicts to show
        #[arg(long, value_enum, default_value_t = StatusFilter::Unresolved)]
        status: StatusFilter,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show field discrepancies of one conflict
    Show {
        /// Conflict ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve one conflict and print the entity to persist
    Resolve {
        /// Conflict ID or unique ID prefix
        id: String,
        /// Resolution strategy
        #[arg(long, value_enum)]
        strategy: StrategyArg,
        /// Keep one side for a field: FIELD=local or FIELD=server
        #[arg(long = "pick", value_name = "FIELD=SIDE")]
        picks: Vec<String>,
        /// Use a custom JSON value for a field: FIELD=JSON
        #[arg(long = "set", value_name = "FIELD=JSON")]
        sets: Vec<String>,
    },
    /// Resolve every open conflict with one strategy
    ResolveAll {
        /// Resolution strategy (merge is not allowed in batches)
        #[arg(long, value_enum)]
        strategy: StrategyArg,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusFilter {
    Unresolved,
    Resolved,
    All,
}

impl StatusFilter {
    pub const fn status(self) -> Option<ConflictStatus> {
        match self {
            Self::Unresolved => Some(ConflictStatus::Unresolved),
            Self::Resolved => Some(ConflictStatus::Resolved),
            Self::All => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StrategyArg {
    Local,
    Server,
    Merge,
}

impl From<StrategyArg> for Strategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Local => Self::LocalWins,
            StrategyArg::Server => Self::ServerWins,
            StrategyArg::Merge => Self::Merge,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}
