//! Remote shell command builders for the benchmark lifecycle

use crate::models::Config;
use crate::topology::TestPair;

/// Builds the shell commands issued on fleet nodes
#[derive(Debug, Clone)]
pub struct BenchmarkCommands {
    binary: String,
    gid_index: u32,
    remote_dir: String,
}

impl BenchmarkCommands {
    pub fn new(binary: impl Into<String>, gid_index: u32, remote_dir: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            gid_index,
            remote_dir: remote_dir.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.benchmark_binary, config.gid_index, &config.remote_dir)
    }

    pub fn remote_dir(&self) -> &str {
        &self.remote_dir
    }

    /// `{client}_{intf}__{server}_{intf}.txt`
    pub fn artifact_name(pair: &TestPair, interface: &str) -> String {
        format!(
            "{}_{}__{}_{}.{}",
            pair.client,
            interface,
            pair.server,
            interface,
            crate::defaults::ARTIFACT_EXTENSION
        )
    }

    /// Artifact location on the client node
    pub fn artifact_path(&self, pair: &TestPair, interface: &str) -> String {
        format!("{}/{}", self.remote_dir, Self::artifact_name(pair, interface))
    }

    /// Backgrounded server listener; returns immediately
    pub fn server_start(&self, interface: &str, port: u16) -> String {
        format!(
            "nohup {} -d {} -p {} -g {} > /dev/null 2>&1 &",
            self.binary, interface, port, self.gid_index
        )
    }

    /// Backgrounded client writing its console output to the artifact path
    pub fn client_start(&self, pair: &TestPair, interface: &str, port: u16) -> String {
        format!(
            "nohup {} -d {} -p {} -g {} {} > {} 2>&1 &",
            self.binary,
            interface,
            port,
            self.gid_index,
            pair.server,
            self.artifact_path(pair, interface)
        )
    }

    /// Kill every benchmark process still running on a node
    pub fn kill_all(&self) -> String {
        format!("nohup pkill -f {} > /dev/null 2>&1 &", self.binary)
    }

    /// Create the working directory and sweep old artifacts
    pub fn prepare_workspace(&self) -> String {
        format!("mkdir -p {dir}; rm -f -R {dir}/*", dir = self.remote_dir)
    }
}

impl Default for BenchmarkCommands {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
