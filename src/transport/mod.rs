//! Completion signal transport
//!
//! Walkers report to the coordinator through a [`CompletionSender`]; the
//! coordinator drains a [`CompletionReceiver`]. Both ends come from a
//! [`Transport`], so the roles never see whether signals travel over an
//! in-memory channel or a socket.
//!
//! # Modules
//!
//! - `channel`: in-memory transport for threads mode and tests
//! - `protocol`: wire message and framing
//! - `tcp`: socket transport for process groups

pub mod channel;
pub mod protocol;
pub mod tcp;

use crate::group::Rank;
use crate::Result;

/// The single message a walker sends when its walk ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionSignal {
    /// Rank of the walker that finished
    pub source: Rank,
    /// Step count at which the walk stopped
    pub steps: i32,
}

/// Outbound end held by a walker
///
/// `send` consumes the sender, so a walker can signal completion only once.
pub trait CompletionSender {
    fn send(self, signal: CompletionSignal) -> Result<()>;
}

/// Inbound end held by the coordinator
pub trait CompletionReceiver {
    /// Block until a signal from any walker arrives
    fn recv(&mut self) -> Result<CompletionSignal>;
}

/// Source of transport endpoints for one group member
pub trait Transport {
    type Sender: CompletionSender;
    type Receiver: CompletionReceiver;

    /// Open the coordinator's inbound end
    fn open_inbound(&mut self) -> Result<Self::Receiver>;

    /// Open an outbound end for the walker with rank `source`
    fn open_outbound(&mut self, source: Rank) -> Result<Self::Sender>;
}
