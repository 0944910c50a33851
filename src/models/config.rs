//! Configuration data model and validation

use crate::error::{AppError, Result};
use crate::topology::TopologyMode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// A credential that never shows up in `Debug` output
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Run configuration, built once at startup and shared read-only by every component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Topology mode used to generate pairs
    #[serde(default)]
    pub mode: TopologyMode,

    /// Node list file, one address per line
    #[serde(default = "default_ip_file_path")]
    pub ip_file_path: PathBuf,

    /// Node addresses under test
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Network interfaces benchmarked for every pair
    #[serde(default = "default_interfaces")]
    pub interfaces: Vec<String>,

    /// Lowest port handed out to benchmark jobs
    #[serde(default = "default_min_port")]
    pub min_port: u16,

    /// Highest port handed out to benchmark jobs (inclusive)
    #[serde(default = "default_max_port")]
    pub max_port: u16,

    /// SSH port on every node
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    /// Remote login user
    #[serde(default = "default_username")]
    pub username: String,

    /// Remote login password, only used through sshpass
    #[serde(default, skip_serializing)]
    pub password: Option<Secret>,

    /// Benchmark binary started on both ends of a pair
    #[serde(default = "default_benchmark_binary")]
    pub benchmark_binary: String,

    /// GID index passed to the benchmark binary
    #[serde(default = "default_gid_index")]
    pub gid_index: u32,

    /// Working directory on every node holding raw artifacts
    #[serde(default = "default_remote_dir")]
    pub remote_dir: String,

    /// Directory under which the timestamped result directory is created
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Bound on issuing a single remote command
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,

    /// Per-job wait budget measured from submission
    #[serde(default = "default_batch_deadline_secs")]
    pub batch_deadline_secs: u64,

    /// Bound on fetching one node's artifacts
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u64,

    /// Pause between phases so fire-and-forget jobs can finish
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,

    /// Number of retry passes over failed pairs
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Concurrency for remote directory setup and process cleanup
    #[serde(default = "default_setup_workers")]
    pub setup_workers: usize,

    /// Concurrency for artifact transfer
    #[serde(default = "default_transfer_workers")]
    pub transfer_workers: usize,

    /// Dispatch worker override; `None` derives it from the CPU count
    #[serde(default)]
    pub max_workers: Option<usize>,

    /// Log file for the rolling file sink
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: TopologyMode::default(),
            ip_file_path: default_ip_file_path(),
            nodes: default_nodes(),
            interfaces: default_interfaces(),
            min_port: default_min_port(),
            max_port: default_max_port(),
            ssh_port: default_ssh_port(),
            username: default_username(),
            password: None,
            benchmark_binary: default_benchmark_binary(),
            gid_index: default_gid_index(),
            remote_dir: default_remote_dir(),
            output_root: default_output_root(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            batch_deadline_secs: default_batch_deadline_secs(),
            transfer_timeout_secs: default_transfer_timeout_secs(),
            settle_delay_secs: default_settle_delay_secs(),
            retry_attempts: default_retry_attempts(),
            setup_workers: default_setup_workers(),
            transfer_workers: default_transfer_workers(),
            max_workers: None,
            log_file: default_log_file(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    pub fn batch_deadline(&self) -> Duration {
        Duration::from_secs(self.batch_deadline_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    /// Number of ports in the pool
    pub fn port_count(&self) -> usize {
        if self.min_port > self.max_port {
            0
        } else {
            (self.max_port - self.min_port) as usize + 1
        }
    }

    /// Validate the configuration and return the first error found
    pub fn validate(&self) -> Result<()> {
        if self.nodes.len() < 2 {
            return Err(AppError::validation(format!(
                "At least two nodes are required, got {}",
                self.nodes.len()
            )));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.trim().is_empty() {
                return Err(AppError::validation("Node address cannot be empty"));
            }
            if !seen.insert(node.as_str()) {
                return Err(AppError::validation(format!("Duplicate node address: {}", node)));
            }
        }

        if self.interfaces.is_empty() {
            return Err(AppError::validation("At least one network interface is required"));
        }
        if self.interfaces.iter().any(|i| i.trim().is_empty() || i.contains("__")) {
            return Err(AppError::validation(
                "Interface names must be non-empty and must not contain '__'",
            ));
        }

        if self.min_port > self.max_port {
            return Err(AppError::validation(format!(
                "Port range is empty: min_port {} > max_port {}",
                self.min_port, self.max_port
            )));
        }

        if self.batch_deadline_secs == 0 {
            return Err(AppError::validation("Batch deadline must be greater than 0"));
        }
        if self.dispatch_timeout_secs == 0 {
            return Err(AppError::validation("Dispatch timeout must be greater than 0"));
        }

        if self.setup_workers == 0 || self.transfer_workers == 0 || self.max_workers == Some(0) {
            return Err(AppError::validation("Worker counts must be greater than 0"));
        }

        if self.benchmark_binary.trim().is_empty() {
            return Err(AppError::validation("Benchmark binary cannot be empty"));
        }
        if self.remote_dir.trim().is_empty() {
            return Err(AppError::validation("Remote working directory cannot be empty"));
        }

        Ok(())
    }

    /// Non-fatal observations about the configuration
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let widest_batch = self.nodes.len() / 2 * self.interfaces.len();
        if self.port_count() < widest_batch {
            warnings.push(format!(
                "Port range {}-{} holds {} ports but a batch may dispatch up to {} jobs",
                self.min_port,
                self.max_port,
                self.port_count(),
                widest_batch
            ));
        }

        if self.settle_delay_secs == 0 {
            warnings.push(
                "Settle delay is 0s; artifacts may be fetched before benchmarks finish".to_string(),
            );
        }

        warnings
    }

    /// Merge configuration with environment variables
    pub fn merge_from_env(&mut self) -> Result<()> {
        fn parsed<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
        where
            T::Err: std::fmt::Display,
        {
            value
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))
        }

        if let Ok(user) = std::env::var("PERF_TEST_USER") {
            if !user.trim().is_empty() {
                self.username = user.trim().to_string();
            }
        }

        if let Ok(password) = std::env::var("PERF_TEST_PASS") {
            self.password = (!password.is_empty()).then(|| Secret::new(password));
        }

        if let Ok(port) = std::env::var("PERF_TEST_MIN_PORT") {
            self.min_port = parsed("PERF_TEST_MIN_PORT", &port)?;
        }

        if let Ok(port) = std::env::var("PERF_TEST_MAX_PORT") {
            self.max_port = parsed("PERF_TEST_MAX_PORT", &port)?;
        }

        if let Ok(port) = std::env::var("PERF_TEST_SSH_PORT") {
            self.ssh_port = parsed("PERF_TEST_SSH_PORT", &port)?;
        }

        if let Ok(secs) = std::env::var("PERF_TEST_SETTLE_SECS") {
            self.settle_delay_secs = parsed("PERF_TEST_SETTLE_SECS", &secs)?;
        }

        Ok(())
    }
}

fn default_ip_file_path() -> PathBuf {
    PathBuf::from(crate::defaults::DEFAULT_IP_FILE)
}

pub(crate) fn default_nodes() -> Vec<String> {
    crate::defaults::default_node_list()
}

fn default_interfaces() -> Vec<String> {
    crate::defaults::DEFAULT_INTERFACES
        .iter()
        .map(|&s| s.to_string())
        .collect()
}

fn default_min_port() -> u16 {
    crate::defaults::DEFAULT_MIN_PORT
}

fn default_max_port() -> u16 {
    crate::defaults::DEFAULT_MAX_PORT
}

fn default_ssh_port() -> u16 {
    crate::defaults::DEFAULT_SSH_PORT
}

fn default_username() -> String {
    crate::defaults::DEFAULT_USERNAME.to_string()
}

fn default_benchmark_binary() -> String {
    crate::defaults::DEFAULT_BENCHMARK_BINARY.to_string()
}

fn default_gid_index() -> u32 {
    crate::defaults::DEFAULT_GID_INDEX
}

fn default_remote_dir() -> String {
    crate::defaults::DEFAULT_REMOTE_DIR.to_string()
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_dispatch_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_DISPATCH_TIMEOUT.as_secs()
}

fn default_batch_deadline_secs() -> u64 {
    crate::defaults::DEFAULT_BATCH_DEADLINE.as_secs()
}

fn default_transfer_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_TRANSFER_TIMEOUT.as_secs()
}

fn default_settle_delay_secs() -> u64 {
    crate::defaults::DEFAULT_SETTLE_DELAY.as_secs()
}

fn default_retry_attempts() -> u32 {
    crate::defaults::DEFAULT_RETRY_ATTEMPTS
}

fn default_setup_workers() -> usize {
    crate::defaults::DEFAULT_SETUP_WORKERS
}

fn default_transfer_workers() -> usize {
    crate::defaults::DEFAULT_TRANSFER_WORKERS
}

fn default_log_file() -> PathBuf {
    PathBuf::from(crate::defaults::DEFAULT_LOG_FILE)
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
