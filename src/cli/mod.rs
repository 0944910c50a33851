//! Command-line interface

use crate::topology::TopologyMode;
use clap::Parser;
use std::path::PathBuf;

/// Mesh Bandwidth Tester - pairwise bandwidth benchmarks across a node fleet
#[derive(Parser, Debug, Clone)]
#[command(name = "mbt")]
#[command(version, long_version = crate::LONG_VERSION, about, long_about = None)]
#[command(after_help = "Environment: PERF_TEST_USER, PERF_TEST_PASS, PERF_TEST_MIN_PORT, \
PERF_TEST_MAX_PORT, PERF_TEST_SSH_PORT, PERF_TEST_SETTLE_SECS (also read from .env)")]
pub struct Cli {
    /// Test mode: half_full (each unordered pair once) or full_mesh (both directions)
    #[arg(long, value_parser = parse_mode, value_name = "MODE")]
    pub mode: Option<TopologyMode>,

    /// Path to file containing the node IP list, one per line
    #[arg(long, alias = "ip_file_path", value_name = "PATH")]
    pub ip_file_path: Option<PathBuf>,

    /// Directory in which the timestamped result directory is created
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of retry passes over failed pairs
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Concurrent benchmark dispatches (default: 2 per CPU, max 128)
    #[arg(long, value_parser = parse_workers, value_name = "N")]
    pub workers: Option<usize>,

    /// Seconds to wait between phases for launched benchmarks to finish
    #[arg(long, value_parser = parse_settle, value_name = "SECS")]
    pub settle_secs: Option<u64>,

    /// Force colored output
    #[arg(long, conflicts_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Print the pair count and batch plan without contacting any node
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }
}

fn parse_mode(s: &str) -> Result<TopologyMode, String> {
    s.parse().map_err(|e: crate::error::AppError| e.to_string())
}

fn parse_workers(s: &str) -> Result<usize, String> {
    s.parse::<usize>()
        .map_err(|_| format!("Invalid worker count: {}", s))
        .and_then(|workers| {
            if workers == 0 {
                Err("Worker count must be greater than 0".to_string())
            } else if workers > crate::defaults::MAX_DISPATCH_WORKERS {
                Err(format!(
                    "Worker count cannot exceed {}",
                    crate::defaults::MAX_DISPATCH_WORKERS
                ))
            } else {
                Ok(workers)
            }
        })
}

/// Parse a settle delay in seconds; zero is allowed
fn parse_settle(s: &str) -> Result<u64, String> {
    if s.starts_with('+') {
        return Err(format!("Invalid duration: {}", s));
    }
    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs > 300 {
                Err("Settle delay cannot exceed 300 seconds".to_string())
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    cfg!(unix)
}
