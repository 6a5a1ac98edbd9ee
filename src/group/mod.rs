//! Process group and role dispatch
//!
//! Every member of a run knows two immutable facts about itself: the group
//! size and its own rank. Rank 0 is the coordinator; every other rank walks.

use crate::config::WalkConfig;
use crate::coordinator::Controller;
use crate::transport::Transport;
use crate::walk::{derive_seed, WalkOutcome};
use crate::worker::Walker;
use crate::Result;
use thiserror::Error;

/// Identity of a group member
pub type Rank = u32;

/// Rank reserved for the coordinator
pub const COORDINATOR_RANK: Rank = 0;

/// Group bootstrap errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("group size must be at least 1")]
    Empty,

    #[error("rank {rank} is outside a group of size {size}")]
    RankOutOfRange { rank: Rank, size: u32 },

    #[error("{0} is required in rank mode")]
    Missing(&'static str),
}

/// This process's place in the group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessGroup {
    rank: Rank,
    size: u32,
}

impl ProcessGroup {
    pub fn new(rank: Rank, size: u32) -> std::result::Result<Self, GroupError> {
        if size == 0 {
            return Err(GroupError::Empty);
        }
        if rank >= size {
            return Err(GroupError::RankOutOfRange { rank, size });
        }
        Ok(Self { rank, size })
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR_RANK
    }

    /// Number of completion signals the coordinator waits for
    pub fn expected_walkers(&self) -> usize {
        (self.size - 1) as usize
    }

    /// Ranks of every walker in the group
    pub fn walker_ranks(&self) -> impl Iterator<Item = Rank> {
        1..self.size
    }
}

/// What a member does for the run
#[derive(Debug)]
pub enum Role {
    Coordinator(Controller),
    Worker(Walker),
}

/// Result of running a role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleOutcome {
    /// The coordinator saw this many walkers finish
    Coordinated { finished: usize },
    /// A walker finished its walk
    Walked(WalkOutcome),
}

impl Role {
    /// Pick the role for a member
    ///
    /// `seed_base` of `None` seeds walkers from the wall clock.
    pub fn assign(group: ProcessGroup, config: &WalkConfig, seed_base: Option<u64>) -> Self {
        if group.is_coordinator() {
            Role::Coordinator(Controller::new(group.expected_walkers()))
        } else {
            let seed = derive_seed(seed_base, group.rank());
            Role::Worker(Walker::new(group.rank(), *config, seed))
        }
    }

    /// Run the role to completion over the given transport
    ///
    /// A coordinator with no walkers never opens its inbound end.
    pub fn run<T: Transport>(self, transport: &mut T) -> Result<RoleOutcome> {
        match self {
            Role::Coordinator(controller) => {
                let finished = controller.run_with(|| transport.open_inbound())?;
                Ok(RoleOutcome::Coordinated { finished })
            }
            Role::Worker(walker) => {
                let outbound = transport.open_outbound(walker.rank())?;
                let outcome = walker.run(outbound)?;
                Ok(RoleOutcome::Walked(outcome))
            }
        }
    }
}
