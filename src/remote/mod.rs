//! Remote command transport
//!
//! The orchestrator only needs two capabilities from a host: run a shell
//! command and get its stdout/exit status back, and copy a remote directory's
//! files to a local directory. [`RemoteExecutor`] is that seam; [`SshExecutor`]
//! implements it with the system `ssh`/`scp` clients.

pub mod commands;
pub mod ssh;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use commands::BenchmarkCommands;
pub use ssh::SshExecutor;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Captured result of one remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run commands on and fetch files from fleet nodes
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run `command` through the remote shell on `host`, bounded by `timeout`
    async fn run(&self, host: &str, command: &str, timeout: Duration) -> Result<CommandOutput>;

    /// Copy every file under `remote_dir` on `host` into `local_dir`
    async fn fetch(
        &self,
        host: &str,
        remote_dir: &str,
        local_dir: &Path,
        timeout: Duration,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_output_success() {
        let output = CommandOutput::success("ok");
        assert!(output.is_success());
        assert_eq!(output.stdout, "ok");

        let killed = CommandOutput {
            exit_code: None,
            ..Default::default()
        };
        assert!(!killed.is_success());
    }
}
