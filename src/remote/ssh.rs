//! `ssh`/`scp` backed remote executor

use super::{CommandOutput, RemoteExecutor};
use crate::error::{AppError, Result};
use crate::models::Config;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// ssh exits with 255 when the connection itself failed
const SSH_CONNECTION_FAILURE: i32 = 255;

/// Runs remote commands through the system OpenSSH client
#[derive(Clone)]
pub struct SshExecutor {
    username: String,
    port: u16,
    password: Option<String>,
}

impl std::fmt::Debug for SshExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshExecutor")
            .field("username", &self.username)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SshExecutor {
    pub fn new(username: impl Into<String>, port: u16, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            port,
            password,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.username,
            config.ssh_port,
            config.password.as_ref().map(|p| p.expose().to_string()),
        )
    }

    /// `ssh`/`scp`, wrapped in `sshpass -e` when a password is configured
    fn command(&self, program: &str) -> Command {
        let mut command = match &self.password {
            Some(password) => {
                let mut command = Command::new("sshpass");
                command.arg("-e").arg(program).env("SSHPASS", password);
                command
            }
            None => Command::new(program),
        };
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Options shared by ssh and scp
    fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
        ];
        if self.password.is_none() {
            args.push("-o".to_string());
            args.push("BatchMode=yes".to_string());
        }
        args
    }

    fn destination(&self, host: &str) -> String {
        if self.username.is_empty() {
            host.to_string()
        } else {
            format!("{}@{}", self.username, host)
        }
    }

    async fn output_within(
        mut command: Command,
        timeout: Duration,
        what: &str,
    ) -> Result<std::process::Output> {
        match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(AppError::transport(format!("Failed to spawn {}: {}", what, e))),
            Err(_) => Err(AppError::timeout(format!("{} timed out after {:?}", what, timeout))),
        }
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn run(&self, host: &str, command: &str, timeout: Duration) -> Result<CommandOutput> {
        let mut ssh = self.command("ssh");
        ssh.arg("-p")
            .arg(self.port.to_string())
            .args(self.common_args())
            .arg(self.destination(host))
            .arg(command);

        let output = Self::output_within(ssh, timeout, &format!("ssh {}", host)).await?;
        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        };

        if result.exit_code == Some(SSH_CONNECTION_FAILURE) {
            return Err(AppError::transport(format!(
                "ssh {} failed: {}",
                host,
                result.stderr.trim()
            )));
        }

        Ok(result)
    }

    async fn fetch(
        &self,
        host: &str,
        remote_dir: &str,
        local_dir: &Path,
        timeout: Duration,
    ) -> Result<()> {
        let source = format!(
            "{}:{}/*",
            self.destination(host),
            remote_dir.trim_end_matches('/')
        );
        let target = format!("{}/", local_dir.display());

        let mut scp = self.command("scp");
        scp.arg("-P")
            .arg(self.port.to_string())
            .args(self.common_args())
            .arg("-r")
            .arg(&source)
            .arg(&target);

        let output = Self::output_within(scp, timeout, &format!("scp from {}", host)).await?;
        if !output.status.success() {
            return Err(AppError::transport(format!(
                "Failed to collect files from node {}: {}",
                host,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}
