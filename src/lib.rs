//! Mesh Bandwidth Tester
//!
//! Orchestrates pairwise network bandwidth benchmarks across a fleet of nodes.
//! Node pairs are split into conflict-free batches, every batch is dispatched
//! concurrently over SSH with a shared ephemeral port pool, and pass/fail is
//! reconciled afterwards from the artifacts each benchmark leaves behind.
//! Failed node pairs are retried a fixed number of times.

pub mod app;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod remote;
pub mod retry;
pub mod topology;

// Re-export commonly used types
pub use app::{App, RunSummary};
pub use collector::ResultCollector;
pub use error::{AppError, Result};
pub use executor::{ExecutionEngine, PortAllocator, PortLease};
pub use logging::{LogListener, Logger};
pub use models::{Config, TestReport, TestResult};
pub use remote::{RemoteExecutor, SshExecutor};
pub use retry::RetryCoordinator;
pub use topology::{generate_pairs, Batch, BatchScheduler, TestPair, TopologyMode};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Version plus the commit, build time and target recorded by the build script
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("GIT_COMMIT"),
    "\nbuilt: ",
    env!("BUILD_TIME"),
    "\ntarget: ",
    env!("TARGET_TRIPLE"),
);

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_IP_FILE: &str = "ips_list.txt";
    pub const DEFAULT_LOG_FILE: &str = "perftest.log";
    pub const DEFAULT_INTERFACES: &[&str] = &[
        "mlx5_0", "mlx5_1", "mlx5_4", "mlx5_5",
        "mlx5_6", "mlx5_7", "mlx5_10", "mlx5_11",
    ];
    pub const DEFAULT_MIN_PORT: u16 = 35000;
    pub const DEFAULT_MAX_PORT: u16 = 45000;
    pub const DEFAULT_SSH_PORT: u16 = 22;
    pub const DEFAULT_USERNAME: &str = "metaxadmin";
    pub const DEFAULT_BENCHMARK_BINARY: &str = "ibv_rc_pingpong";
    pub const DEFAULT_GID_INDEX: u32 = 3;
    pub const DEFAULT_REMOTE_DIR: &str = "./rping";
    pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(3);
    pub const DEFAULT_BATCH_DEADLINE: Duration = Duration::from_secs(120);
    pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);
    pub const DEFAULT_RETRY_ATTEMPTS: u32 = 2;
    pub const DEFAULT_SETUP_WORKERS: usize = 20;
    pub const DEFAULT_TRANSFER_WORKERS: usize = 10;
    pub const MAX_DISPATCH_WORKERS: usize = 128;
    pub const DEFAULT_ENABLE_COLOR: bool = true;
    pub const PASSED_DATASET: &str = "rdma_analysis_passed.csv";
    pub const FAILED_DATASET: &str = "rdma_analysis_failed.csv";
    pub const ARTIFACT_DIR: &str = "rping_results";
    pub const ARTIFACT_EXTENSION: &str = "txt";

    /// Fallback fleet used when no node list file is present
    pub fn default_node_list() -> Vec<String> {
        (14..28).map(|idx| format!("10.200.146.{}", idx)).collect()
    }
}
