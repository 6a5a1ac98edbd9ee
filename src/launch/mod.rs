//! Run modes
//!
//! A run needs a process group before roles can be assigned. There are three
//! ways to get one:
//!
//! - **Threads**: the whole group lives in this process, walkers are OS
//!   threads, signals travel over an in-memory channel.
//! - **Processes**: this process is rank 0. It binds the coordinator
//!   listener on an ephemeral loopback port, then spawns ranks 1..N-1 as
//!   children of the same executable in rank mode.
//! - **Member**: this process is one rank of a group launched by someone
//!   else and reports over TCP to a known coordinator address. Rank 0 binds
//!   that address only if the group has walkers.

use crate::config::WalkConfig;
use crate::group::{ProcessGroup, Rank, Role, RoleOutcome};
use crate::transport::channel::ChannelTransport;
use crate::transport::tcp::TcpTransport;
use crate::Result;
use anyhow::Context;
use std::net::{Ipv4Addr, SocketAddr};
use std::process::{Child, Command, Stdio};
use std::thread;

/// Settings for launching a group of child processes
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Group size, coordinator included
    pub size: u32,
    /// Base seed forwarded to every child
    pub seed: Option<u64>,
    /// Forward `--debug` to children
    pub debug: bool,
    /// Positional walk parameters, forwarded verbatim
    pub params: Vec<String>,
}

/// Name this program was invoked as, for usage lines
pub fn program_name() -> String {
    std::env::args()
        .next()
        .as_deref()
        .map(std::path::Path::new)
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

/// Run a whole group inside this process
///
/// Returns the number of walkers the coordinator saw finish.
pub fn run_threads(size: u32, config: &WalkConfig, seed: Option<u64>) -> Result<usize> {
    let group = ProcessGroup::new(0, size)?;
    let mut transport = ChannelTransport::new();

    let mut handles = Vec::with_capacity(group.expected_walkers());
    for rank in group.walker_ranks() {
        let role = Role::assign(ProcessGroup::new(rank, size)?, config, seed);
        let mut member_transport = transport.handle();

        let handle = thread::Builder::new()
            .name(format!("walker-{}", rank))
            .spawn(move || role.run(&mut member_transport))
            .with_context(|| format!("Failed to spawn walker thread {}", rank))?;
        handles.push(handle);
    }

    let outcome = Role::assign(group, config, seed).run(&mut transport)?;

    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("Walker thread panicked"))??;
    }

    finished_count(outcome)
}

/// Run as rank 0 of a freshly spawned group of processes
///
/// Returns the number of walkers the coordinator saw finish.
pub fn run_processes(options: &LaunchOptions, config: &WalkConfig) -> Result<usize> {
    let group = ProcessGroup::new(0, options.size)?;
    let mut transport = TcpTransport::listen(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))?;
    let coordinator = transport.coordinator_addr();

    let mut members = Vec::with_capacity(group.expected_walkers());
    for rank in group.walker_ranks() {
        match spawn_member(rank, coordinator, options) {
            Ok(child) => members.push((rank, child)),
            Err(e) => {
                kill_members(members);
                return Err(e);
            }
        }
    }

    let outcome = match Role::assign(group, config, options.seed).run(&mut transport) {
        Ok(outcome) => outcome,
        Err(e) => {
            kill_members(members);
            return Err(e);
        }
    };

    reap_members(members)?;
    finished_count(outcome)
}

/// Run one member of an externally launched group
pub fn run_member(
    group: ProcessGroup,
    coordinator: SocketAddr,
    config: &WalkConfig,
    seed: Option<u64>,
) -> Result<RoleOutcome> {
    let mut transport = TcpTransport::to(coordinator);

    log::debug!(
        "Rank {}/{} reporting via {}",
        group.rank(),
        group.size(),
        transport.coordinator_addr()
    );

    Role::assign(group, config, seed).run(&mut transport)
}

fn finished_count(outcome: RoleOutcome) -> Result<usize> {
    match outcome {
        RoleOutcome::Coordinated { finished } => Ok(finished),
        RoleOutcome::Walked(_) => anyhow::bail!("Rank 0 ran as a walker"),
    }
}

/// Spawn one rank of the group as a child process
fn spawn_member(rank: Rank, coordinator: SocketAddr, options: &LaunchOptions) -> Result<Child> {
    let exe_path = std::env::current_exe()
        .context("Failed to get current executable path")?;

    let mut cmd = Command::new(&exe_path);
    cmd.arg("--mode").arg("rank");
    cmd.arg("--rank").arg(rank.to_string());
    cmd.arg("--size").arg(options.size.to_string());
    cmd.arg("--coordinator").arg(coordinator.to_string());

    if let Some(seed) = options.seed {
        cmd.arg("--seed").arg(seed.to_string());
    }
    if options.debug {
        cmd.arg("--debug");
    }

    cmd.arg("--").args(&options.params);

    // Children share our stdout so their result lines reach the console
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::inherit());
    cmd.stderr(Stdio::inherit());

    let child = cmd.spawn()
        .with_context(|| format!("Failed to spawn rank {}", rank))?;

    log::debug!("Rank {} launched (PID: {})", rank, child.id());
    Ok(child)
}

/// Wait for every child and fail if any of them failed
fn reap_members(members: Vec<(Rank, Child)>) -> Result<()> {
    let mut failed = Vec::new();

    for (rank, mut child) in members {
        let status = child.wait()
            .with_context(|| format!("Failed to wait for rank {}", rank))?;
        log::debug!("Rank {} exited with status: {}", rank, status);
        if !status.success() {
            failed.push(rank);
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("Ranks exited unsuccessfully: {:?}", failed);
    }
    Ok(())
}

fn kill_members(members: Vec<(Rank, Child)>) {
    for (rank, mut child) in members {
        if let Err(e) = child.kill() {
            log::warn!("Failed to kill rank {}: {}", rank, e);
        }
        let _ = child.wait();
    }
}
