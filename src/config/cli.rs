//! CLI argument parsing using clap

use crate::group::{GroupError, ProcessGroup, Rank};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;

/// Default coordinator address for externally launched groups
pub const DEFAULT_COORDINATOR: &str = "127.0.0.1:7878";

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Launch mode (default) - this process is rank 0 and spawns the other ranks
    Launch,
    /// Threads mode - the whole group runs as threads of one process
    Threads,
    /// Rank mode - run a single member of an externally launched group
    Rank,
}

/// walkgroup - bounded random walks across a process group
#[derive(Parser, Debug)]
#[command(name = "walkgroup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: launch, threads, or rank
    #[arg(long, value_enum, default_value = "launch")]
    pub mode: ExecutionMode,

    /// Group size for launch and threads mode (coordinator included)
    #[arg(short = 'n', long)]
    pub np: Option<u32>,

    /// This member's rank (rank mode only)
    #[arg(long, env = "WALKGROUP_RANK")]
    pub rank: Option<Rank>,

    /// Group size (rank mode only)
    #[arg(long, env = "WALKGROUP_SIZE")]
    pub size: Option<u32>,

    /// Address rank 0 listens on and walkers report to (rank mode only)
    #[arg(long, env = "WALKGROUP_COORDINATOR", default_value = DEFAULT_COORDINATOR)]
    pub coordinator: SocketAddr,

    /// Base seed for reproducible runs (default: wall clock)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Walk parameters: <domain_size> <max_steps>
    #[arg(value_name = "PARAM", num_args = 0.., allow_negative_numbers = true)]
    pub params: Vec<String>,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Group size for launch and threads mode
    pub fn group_size(&self) -> u32 {
        self.np
            .unwrap_or_else(|| u32::try_from(num_cpus::get()).unwrap_or(u32::MAX))
    }

    /// Whether this process explains startup errors
    ///
    /// Only rank 0 does. A member started without `--rank` also reports,
    /// since it cannot know it is a walker.
    pub fn reports_errors(&self) -> bool {
        match self.mode {
            ExecutionMode::Launch | ExecutionMode::Threads => true,
            ExecutionMode::Rank => self.rank.map_or(true, |rank| rank == 0),
        }
    }

    /// Establish this process's identity within the group
    pub fn process_group(&self) -> Result<ProcessGroup, GroupError> {
        match self.mode {
            ExecutionMode::Launch | ExecutionMode::Threads => {
                ProcessGroup::new(0, self.group_size())
            }
            ExecutionMode::Rank => {
                let rank = self.rank.ok_or(GroupError::Missing("--rank"))?;
                let size = self.size.ok_or(GroupError::Missing("--size"))?;
                ProcessGroup::new(rank, size)
            }
        }
    }
}
