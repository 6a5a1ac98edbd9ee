//! End-to-end runs of the walkgroup binary

use std::process::{Command, Output};

fn walkgroup(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_walkgroup"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("WALKGROUP_RANK")
        .env_remove("WALKGROUP_SIZE")
        .env_remove("WALKGROUP_COORDINATOR")
        .output()
        .expect("failed to run walkgroup")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

fn walker_steps(line: &str) -> Option<(u32, i32)> {
    let rest = line.strip_prefix("Rank ")?;
    let (rank, rest) = rest.split_once(": Walker finished in ")?;
    let steps = rest.strip_suffix(" steps.")?;
    Some((rank.parse().ok()?, steps.parse().ok()?))
}

fn assert_group_run(output: &Output, walkers: u32, max_steps: i32) {
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let lines = stdout_lines(output);
    assert_eq!(lines.len(), walkers as usize + 1, "stdout: {:?}", lines);

    let mut ranks: Vec<u32> = lines[..lines.len() - 1]
        .iter()
        .map(|line| {
            let (rank, steps) = walker_steps(line).unwrap_or_else(|| panic!("bad line {:?}", line));
            assert!(steps >= 1 && steps <= max_steps, "steps out of range: {}", line);
            rank
        })
        .collect();
    ranks.sort_unstable();
    assert_eq!(ranks, (1..=walkers).collect::<Vec<_>>());

    assert_eq!(
        lines.last().unwrap(),
        &format!("Controller: All {} walkers have finished.", walkers)
    );
}

#[test]
fn test_process_group_of_four() {
    let output = walkgroup(&["--np", "4", "5", "1000"]);
    assert_group_run(&output, 3, 1000);
}

#[test]
fn test_thread_group_of_four() {
    let output = walkgroup(&["--mode", "threads", "--np", "4", "5", "1000"]);
    assert_group_run(&output, 3, 1000);
}

#[test]
fn test_single_step_walk() {
    let output = walkgroup(&["--np", "2", "1", "1"]);
    assert_group_run(&output, 1, 1);
    assert_eq!(stdout_lines(&output)[0], "Rank 1: Walker finished in 1 steps.");
}

#[test]
fn test_coordinator_only_group() {
    let output = walkgroup(&["--np", "1", "5", "1000"]);
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["Controller: All 0 walkers have finished.".to_string()]
    );
}

#[test]
fn test_wrong_argument_count_prints_usage_once() {
    let output = walkgroup(&["--np", "4", "5"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("Usage:").count(), 1, "stderr: {}", stderr);
    assert!(stderr.contains("<domain_size> <max_steps>"));
}

#[test]
fn test_non_positive_parameter_rejected() {
    let output = walkgroup(&["--np", "2", "5", "-3"]);
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("max_steps must be positive"), "stderr: {}", stderr);
    assert_eq!(stderr.matches("Usage:").count(), 1);
}

#[test]
fn test_walker_rank_stays_silent_on_usage_error() {
    let output = walkgroup(&["--mode", "rank", "--rank", "2", "--size", "4", "5"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stderr.is_empty());
}

#[test]
fn test_walker_rank_stays_silent_on_group_error() {
    let output = walkgroup(&["--mode", "rank", "--rank", "2", "--size", "0", "5", "10"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stderr.is_empty());

    let output = walkgroup(&["--mode", "rank", "--rank", "0", "--size", "0", "5", "10"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("Error:").count(), 1, "stderr: {}", stderr);
}

#[test]
fn test_lone_rank_zero_ignores_busy_coordinator_port() {
    let busy = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = busy.local_addr().unwrap().to_string();

    let output = walkgroup(&["--mode", "rank", "--rank", "0", "--size", "1", "--coordinator", &addr, "5", "10"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_lines(&output),
        vec!["Controller: All 0 walkers have finished.".to_string()]
    );
}

#[test]
fn test_seeded_threads_run_is_reproducible() {
    let args = ["--mode", "threads", "--np", "5", "--seed", "1234", "10", "5000"];
    let mut first = stdout_lines(&walkgroup(&args));
    let mut second = stdout_lines(&walkgroup(&args));
    first.sort();
    second.sort();
    assert_eq!(first, second);
}
