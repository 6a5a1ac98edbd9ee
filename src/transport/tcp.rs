//! TCP transport for process groups
//!
//! The coordinator binds a listener and accepts one connection per walker.
//! Each connection gets its own reader task; every decoded completion is
//! pushed onto a single queue, so `recv` yields signals in arrival order
//! regardless of which walker sent them. Frames with any other tag are logged
//! and skipped; they neither end the wait nor count as a completion.
//!
//! Walkers connect, write one frame, flush, and hang up. Because walkers may
//! start before the coordinator is listening, connecting is retried for a
//! short while.

use super::protocol::{read_message, write_message, CompletionMessage};
use super::{CompletionReceiver, CompletionSender, CompletionSignal, Transport};
use crate::group::Rank;
use crate::Result;
use anyhow::Context;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Connection attempts before a walker gives up
const CONNECT_ATTEMPTS: u32 = 50;

/// Delay between connection attempts
const CONNECT_RETRY: Duration = Duration::from_millis(100);

/// Socket transport for one group member
pub struct TcpTransport {
    coordinator: SocketAddr,
    listener: Option<TcpCompletionReceiver>,
}

impl TcpTransport {
    /// Transport for a walker reporting to `coordinator`
    pub fn to(coordinator: SocketAddr) -> Self {
        Self {
            coordinator,
            listener: None,
        }
    }

    /// Transport for the coordinator, bound immediately
    ///
    /// Binding up front lets the caller learn the actual address (for
    /// example when `addr` uses port 0) before any walker starts.
    pub fn listen(addr: SocketAddr) -> Result<Self> {
        let listener = TcpCompletionReceiver::bind(addr)?;
        Ok(Self {
            coordinator: listener.local_addr(),
            listener: Some(listener),
        })
    }

    /// Address walkers report to
    pub fn coordinator_addr(&self) -> SocketAddr {
        self.coordinator
    }
}

impl Transport for TcpTransport {
    type Sender = TcpCompletionSender;
    type Receiver = TcpCompletionReceiver;

    fn open_inbound(&mut self) -> Result<TcpCompletionReceiver> {
        match self.listener.take() {
            Some(listener) => Ok(listener),
            None => TcpCompletionReceiver::bind(self.coordinator),
        }
    }

    fn open_outbound(&mut self, source: Rank) -> Result<TcpCompletionSender> {
        TcpCompletionSender::connect(self.coordinator, source)
    }
}

/// Coordinator side: listener plus the queue fed by per-connection readers
pub struct TcpCompletionReceiver {
    runtime: Runtime,
    local_addr: SocketAddr,
    inbox: mpsc::UnboundedReceiver<CompletionSignal>,
}

impl TcpCompletionReceiver {
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        let listener = runtime
            .block_on(TcpListener::bind(addr))
            .with_context(|| format!("Failed to bind coordinator listener on {}", addr))?;
        let local_addr = listener.local_addr()
            .context("Failed to read listener address")?;

        log::debug!("Coordinator listening on {}", local_addr);

        let (tx, inbox) = mpsc::unbounded_channel();
        runtime.spawn(accept_loop(listener, tx));

        Ok(Self {
            runtime,
            local_addr,
            inbox,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl CompletionReceiver for TcpCompletionReceiver {
    fn recv(&mut self) -> Result<CompletionSignal> {
        self.runtime
            .block_on(self.inbox.recv())
            .context("Completion listener stopped")
    }
}

/// Accept walker connections until the runtime shuts down
async fn accept_loop(listener: TcpListener, tx: mpsc::UnboundedSender<CompletionSignal>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                log::debug!("Walker connected from {}", peer);
                let tx = tx.clone();
                tokio::spawn(forward_messages(stream, peer, tx));
            }
            Err(e) => {
                log::warn!("Failed to accept walker connection: {}", e);
            }
        }
    }
}

/// Forward every completion on one connection to the shared queue
async fn forward_messages(
    mut stream: TcpStream,
    peer: SocketAddr,
    tx: mpsc::UnboundedSender<CompletionSignal>,
) {
    loop {
        match read_message(&mut stream).await {
            Ok(Some(msg)) => {
                let signal = match msg.into_signal() {
                    Ok(signal) => signal,
                    Err(e) => {
                        log::warn!("Ignoring message from {}: {}", peer, e);
                        continue;
                    }
                };
                log::debug!("Completion from rank {} ({}): {} steps", signal.source, peer, signal.steps);
                if tx.send(signal).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::warn!("Dropping connection from {}: {:#}", peer, e);
                break;
            }
        }
    }
}

/// Walker side: one connection to the coordinator
pub struct TcpCompletionSender {
    // Dropped before the runtime that drives it
    stream: TcpStream,
    source: Rank,
    runtime: Runtime,
}

impl TcpCompletionSender {
    pub fn connect(coordinator: SocketAddr, source: Rank) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        let stream = runtime
            .block_on(connect_with_retry(coordinator))
            .with_context(|| format!("Rank {} failed to reach coordinator at {}", source, coordinator))?;

        Ok(Self {
            stream,
            source,
            runtime,
        })
    }
}

impl CompletionSender for TcpCompletionSender {
    fn send(mut self, signal: CompletionSignal) -> Result<()> {
        if signal.source != self.source {
            anyhow::bail!(
                "Rank {} tried to send a completion signal for rank {}",
                self.source,
                signal.source
            );
        }

        let msg = CompletionMessage::new(signal);
        self.runtime.block_on(write_message(&mut self.stream, &msg))
    }
}

async fn connect_with_retry(addr: SocketAddr) -> Result<TcpStream> {
    let mut attempt = 1;
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                stream.set_nodelay(true).context("Failed to set TCP_NODELAY")?;
                return Ok(stream);
            }
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                log::debug!("Connect attempt {} to {} failed: {}", attempt, addr, e);
                attempt += 1;
                sleep(CONNECT_RETRY).await;
            }
            Err(e) => return Err(e).context("Failed to connect"),
        }
    }
}
