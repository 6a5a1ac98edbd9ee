//! In-memory transport
//!
//! Every walker holds a clone of one crossbeam sender; the coordinator owns
//! the matching receiver. Used by threads mode and by unit tests.

use super::{CompletionReceiver, CompletionSender, CompletionSignal, Transport};
use crate::group::Rank;
use crate::Result;
use anyhow::Context;
use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

/// Channel-backed transport shared by a whole in-process group
#[derive(Debug)]
pub struct ChannelTransport {
    tx: Sender<CompletionSignal>,
    rx: Option<Receiver<CompletionSignal>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx: Some(rx) }
    }

    /// Take the inbound end, leaving only outbound ends available
    pub fn take_receiver(&mut self) -> Option<ChannelReceiver> {
        self.rx.take().map(|rx| ChannelReceiver { rx })
    }

    /// Outbound end for a walker
    pub fn outbound(&self, source: Rank) -> ChannelSender {
        ChannelSender {
            tx: self.tx.clone(),
            source,
        }
    }

    /// A transport for another member of the same group
    ///
    /// The handle shares the sending side only.
    pub fn handle(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: None,
        }
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ChannelTransport {
    type Sender = ChannelSender;
    type Receiver = ChannelReceiver;

    fn open_inbound(&mut self) -> Result<ChannelReceiver> {
        self.take_receiver()
            .context("Inbound channel already taken")
    }

    fn open_outbound(&mut self, source: Rank) -> Result<ChannelSender> {
        Ok(self.outbound(source))
    }
}

/// Walker side of the in-memory transport
#[derive(Debug)]
pub struct ChannelSender {
    tx: Sender<CompletionSignal>,
    source: Rank,
}

impl CompletionSender for ChannelSender {
    fn send(self, signal: CompletionSignal) -> Result<()> {
        if signal.source != self.source {
            anyhow::bail!(
                "Rank {} tried to send a completion signal for rank {}",
                self.source,
                signal.source
            );
        }
        self.tx
            .send(signal)
            .map_err(|_| anyhow::anyhow!("Coordinator channel closed"))
    }
}

/// Coordinator side of the in-memory transport
#[derive(Debug)]
pub struct ChannelReceiver {
    rx: Receiver<CompletionSignal>,
}

impl ChannelReceiver {
    /// Take a signal if one is already queued
    pub fn try_recv(&self) -> std::result::Result<CompletionSignal, TryRecvError> {
        self.rx.try_recv()
    }
}

impl CompletionReceiver for ChannelReceiver {
    fn recv(&mut self) -> Result<CompletionSignal> {
        self.rx
            .recv()
            .context("All walkers hung up before reporting")
    }
}
