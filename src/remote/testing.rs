//! In-memory fleet for tests
//!
//! A client launch command "produces" its artifact on the client node,
//! immediately or after the configured benchmark duration. `fetch` copies a
//! node's artifacts into the local directory. Enabled for unit tests and,
//! through the `test-utils` feature, for integration tests.

use super::{CommandOutput, RemoteExecutor};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const PASSING_OUTPUT: &str = "  local address:  LID 0x0001, QPN 0x000111, PSN 0x7e1c3a\n\
     remote address: LID 0x0002, QPN 0x000222, PSN 0x1bce8f\n\
     8192000 bytes in 0.69 seconds = 95.32 Mbit/sec\n\
     1000 iters in 0.69 seconds = 687.53 usec/iter\n";

pub const FAILING_OUTPUT: &str = "Failed to modify QP to RTR\nCouldn't connect to server\n";

type ArtifactStore = Arc<Mutex<HashMap<String, HashMap<String, String>>>>;

#[derive(Default)]
pub struct FakeFleet {
    calls: Mutex<Vec<(String, String)>>,
    unreachable: Mutex<HashSet<String>>,
    /// Launches left before an artifact produces passing output
    failures_left: Mutex<HashMap<String, u32>>,
    artifacts: ArtifactStore,
    latency: Mutex<Duration>,
    benchmark_duration: Mutex<Duration>,
}

impl FakeFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unreachable(&self, host: &str) {
        self.unreachable.lock().insert(host.to_string());
    }

    /// Delay every remote command by `latency`
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Write launched artifacts `duration` after the launch returns
    pub fn set_benchmark_duration(&self, duration: Duration) {
        *self.benchmark_duration.lock() = duration;
    }

    /// Make the next `launches` runs of `file_name` fail
    pub fn fail_until_pass(&self, file_name: &str, launches: u32) {
        self.failures_left.lock().insert(file_name.to_string(), launches);
    }

    pub fn put_artifact(&self, host: &str, file_name: &str, content: &str) {
        self.artifacts
            .lock()
            .entry(host.to_string())
            .or_default()
            .insert(file_name.to_string(), content.to_string());
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts.lock().values().map(HashMap::len).sum()
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    /// Client launch commands in issue order, as (client host, artifact name)
    pub fn launches(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|(host, command)| {
                Self::launched_artifact(&command).map(|name| (host, name))
            })
            .collect()
    }

    /// Artifact file name of a client launch, if `command` is one
    fn launched_artifact(command: &str) -> Option<String> {
        let mut tokens = command.split_whitespace().skip_while(|t| *t != ">");
        tokens.next()?;
        let target = tokens.next()?;
        if target == "/dev/null" {
            return None;
        }
        target.rsplit('/').next().map(str::to_string)
    }

    fn output_for(&self, name: &str) -> &'static str {
        let mut failures = self.failures_left.lock();
        match failures.get_mut(name) {
            Some(left) if *left > 0 => {
                *left -= 1;
                FAILING_OUTPUT
            }
            _ => PASSING_OUTPUT,
        }
    }
}

#[async_trait]
impl RemoteExecutor for FakeFleet {
    async fn run(&self, host: &str, command: &str, _timeout: Duration) -> Result<CommandOutput> {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.calls.lock().push((host.to_string(), command.to_string()));

        if self.unreachable.lock().contains(host) {
            return Err(AppError::transport(format!("ssh {} failed: No route to host", host)));
        }

        if command.starts_with("mkdir -p") {
            self.artifacts.lock().remove(host);
        } else if let Some(name) = Self::launched_artifact(command) {
            let content = self.output_for(&name).to_string();
            let duration = *self.benchmark_duration.lock();
            let store = Arc::clone(&self.artifacts);
            let host = host.to_string();
            let write = move || {
                store.lock().entry(host).or_default().insert(name, content);
            };
            if duration.is_zero() {
                write();
            } else {
                tokio::spawn(async move {
                    tokio::time::sleep(duration).await;
                    write();
                });
            }
        }

        Ok(CommandOutput::success(""))
    }

    async fn fetch(
        &self,
        host: &str,
        _remote_dir: &str,
        local_dir: &Path,
        _timeout: Duration,
    ) -> Result<()> {
        if self.unreachable.lock().contains(host) {
            return Err(AppError::transport(format!(
                "Failed to collect files from node {}",
                host
            )));
        }
        let files = self.artifacts.lock().get(host).cloned().unwrap_or_default();
        for (name, content) in files {
            std::fs::write(local_dir.join(name), content)?;
        }
        Ok(())
    }
}
