//! Walker role
//!
//! Each walker owns its walk state outright: a private RNG seeded from its
//! rank, and the position and step counter inside [`RandomWalk`]. When the
//! walk ends it prints one line and reports to the coordinator exactly once.
//!
//! # Example
//!
//! ```
//! use walkgroup::config::WalkConfig;
//! use walkgroup::transport::channel::ChannelTransport;
//! use walkgroup::worker::Walker;
//!
//! let config = WalkConfig::new(5, 1000).unwrap();
//! let mut transport = ChannelTransport::new();
//! let inbound = transport.take_receiver().unwrap();
//!
//! let walker = Walker::new(1, config, 42);
//! let outcome = walker.run(transport.outbound(1))?;
//!
//! assert_eq!(inbound.try_recv().unwrap().steps, outcome.steps);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::config::WalkConfig;
use crate::group::Rank;
use crate::transport::{CompletionSender, CompletionSignal};
use crate::walk::{RandomWalk, WalkOutcome};
use crate::Result;
use anyhow::Context;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// A group member that performs one bounded walk
#[derive(Debug, Clone)]
pub struct Walker {
    rank: Rank,
    config: WalkConfig,
    seed: u64,
}

impl Walker {
    pub fn new(rank: Rank, config: WalkConfig, seed: u64) -> Self {
        Self { rank, config, seed }
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Walk, print the result line, then signal completion
    pub fn run<S: CompletionSender>(self, sender: S) -> Result<WalkOutcome> {
        log::debug!("Rank {}: walking with seed {:#018x} ({})", self.rank, self.seed, self.config);

        let outcome = self.walk();
        log::debug!(
            "Rank {}: stopped at position {} ({:?})",
            self.rank, outcome.position, outcome.termination
        );

        println!("{}", finished_line(self.rank, outcome.steps));

        sender
            .send(CompletionSignal {
                source: self.rank,
                steps: outcome.steps,
            })
            .with_context(|| format!("Rank {} failed to report completion", self.rank))?;

        Ok(outcome)
    }

    /// Perform the walk without reporting it
    pub fn walk(&self) -> WalkOutcome {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        RandomWalk::new(&self.config).run(&mut rng)
    }
}

/// The line a walker prints when it finishes
pub fn finished_line(rank: Rank, steps: i32) -> String {
    format!("Rank {}: Walker finished in {} steps.", rank, steps)
}
