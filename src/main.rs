//! walkgroup CLI entry point

use std::process::ExitCode;
use walkgroup::config::cli::{Cli, ExecutionMode};
use walkgroup::config::{WalkConfig, USAGE_EXIT_CODE};
use walkgroup::launch::{self, LaunchOptions};

/// Exit status for failures after startup
const FAILURE_EXIT_CODE: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    // Only rank 0 explains a bad command line; every rank still exits with 1
    let group = match cli.process_group() {
        Ok(group) => group,
        Err(e) => {
            if cli.reports_errors() {
                eprintln!("Error: {}", e);
            }
            return ExitCode::from(USAGE_EXIT_CODE);
        }
    };

    let config = match WalkConfig::from_params(&cli.params) {
        Ok(config) => config,
        Err(e) => {
            if group.is_coordinator() {
                eprintln!("{}", e.report(&launch::program_name()));
            }
            return ExitCode::from(USAGE_EXIT_CODE);
        }
    };

    log::debug!(
        "Rank {}/{} starting in {:?} mode: {}",
        group.rank(),
        group.size(),
        cli.mode,
        config
    );

    let result = match cli.mode {
        ExecutionMode::Launch => {
            let options = LaunchOptions {
                size: group.size(),
                seed: cli.seed,
                debug: cli.debug,
                params: cli.params.clone(),
            };
            launch::run_processes(&options, &config).map(|_| ())
        }
        ExecutionMode::Threads => {
            launch::run_threads(group.size(), &config, cli.seed).map(|_| ())
        }
        ExecutionMode::Rank => {
            launch::run_member(group, cli.coordinator, &config, cli.seed).map(|_| ())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(FAILURE_EXIT_CODE)
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}
