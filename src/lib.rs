//! walkgroup - bounded random walks across a process group
//!
//! A run is a fixed group of members identified by rank. Rank 0 coordinates;
//! every other rank performs one bounded one-dimensional random walk and
//! reports its step count to the coordinator exactly once. The coordinator
//! counts reports until every walker has finished.
//!
//! # Architecture
//!
//! - **Config**: walk parameters validated once, passed by reference
//! - **Group**: rank/size bootstrap and role dispatch
//! - **Walk**: the pure, seedable walk algorithm
//! - **Worker / Coordinator**: the two roles
//! - **Transport**: completion signals over in-memory channels or TCP
//! - **Launch**: threads, spawned processes, or a single external rank

pub mod config;
pub mod coordinator;
pub mod group;
pub mod launch;
pub mod transport;
pub mod walk;
pub mod worker;

// Re-export commonly used types
pub use config::WalkConfig;
pub use group::{ProcessGroup, Rank, Role, RoleOutcome};
pub use walk::{RandomWalk, Termination, WalkOutcome};

/// Result type used throughout walkgroup
pub type Result<T> = anyhow::Result<T>;
