//! Bounded one-dimensional random walk
//!
//! A walk starts at position 0 and moves -1 or +1 with equal probability on
//! every step. It ends on the first step that leaves
//! `[-domain_size, domain_size]`, or after `max_steps` steps, whichever comes
//! first. The out-of-bounds check runs before the step-budget check, so a walk
//! that leaves the domain on its last permitted step reports as out of bounds.
//!
//! # Example
//!
//! ```
//! use walkgroup::config::WalkConfig;
//! use walkgroup::walk::{RandomWalk, Termination};
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256PlusPlus;
//!
//! let config = WalkConfig::new(5, 1000).unwrap();
//! let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
//! let outcome = RandomWalk::new(&config).run(&mut rng);
//!
//! assert!(outcome.steps >= 1 && outcome.steps <= 1000);
//! if outcome.termination == Termination::StepBudget {
//!     assert_eq!(outcome.steps, 1000);
//! }
//! ```

use crate::config::WalkConfig;
use crate::group::Rank;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Multiplier used to spread ranks across the seed space
const RANK_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Why a walk stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The walker left `[-domain_size, domain_size]`
    OutOfBounds,
    /// The walker used all `max_steps` steps without leaving the domain
    StepBudget,
}

/// Final state of a finished walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOutcome {
    /// Step on which the walk stopped, in `[1, max_steps]`
    pub steps: i32,
    /// Position after the last step
    pub position: i64,
    pub termination: Termination,
}

/// A single bounded walk
#[derive(Debug, Clone, Copy)]
pub struct RandomWalk {
    domain_size: i64,
    max_steps: i32,
}

impl RandomWalk {
    pub fn new(config: &WalkConfig) -> Self {
        Self {
            domain_size: config.domain_size as i64,
            max_steps: config.max_steps,
        }
    }

    /// Walk using moves drawn from `rng`
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> WalkOutcome {
        let mut position: i64 = 0;
        for step in 1..=self.max_steps {
            position += draw_move(&mut *rng);
            if let Some(outcome) = self.escape(step, position) {
                return outcome;
            }
        }
        self.budget_spent(position)
    }

    /// Walk using a predetermined sequence of moves
    ///
    /// Each item is added to the position as one step. Returns `None` if the
    /// sequence runs out before the walk ends.
    pub fn run_moves<I>(&self, moves: I) -> Option<WalkOutcome>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut moves = moves.into_iter();
        let mut position: i64 = 0;
        for step in 1..=self.max_steps {
            position += moves.next()?;
            if let Some(outcome) = self.escape(step, position) {
                return Some(outcome);
            }
        }
        Some(self.budget_spent(position))
    }

    fn escape(&self, step: i32, position: i64) -> Option<WalkOutcome> {
        if position < -self.domain_size || position > self.domain_size {
            Some(WalkOutcome {
                steps: step,
                position,
                termination: Termination::OutOfBounds,
            })
        } else {
            None
        }
    }

    fn budget_spent(&self, position: i64) -> WalkOutcome {
        WalkOutcome {
            steps: self.max_steps,
            position,
            termination: Termination::StepBudget,
        }
    }
}

/// Draw one move, -1 or +1 with equal probability
#[inline]
pub fn draw_move<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    if rng.gen_bool(0.5) {
        1
    } else {
        -1
    }
}

/// Seed for a walker
///
/// `base` defaults to the wall clock in nanoseconds. The rank is mixed in so
/// walkers started at the same instant never share a sequence.
pub fn derive_seed(base: Option<u64>, rank: Rank) -> u64 {
    let base = base.unwrap_or_else(clock_seed);
    base ^ (rank as u64).wrapping_mul(RANK_SEED_STRIDE)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
