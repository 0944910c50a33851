//! Fleet-wide housekeeping: stale process cleanup and remote workspace setup

use crate::{
    logging::Logger,
    models::Config,
    remote::{BenchmarkCommands, RemoteExecutor},
};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Runs one command on every node through a small bounded pool
pub struct FleetOperations {
    remote: Arc<dyn RemoteExecutor>,
    commands: BenchmarkCommands,
    nodes: Vec<String>,
    workers: usize,
    command_timeout: Duration,
    settle_delay: Duration,
    logger: Logger,
}

impl FleetOperations {
    pub fn new(config: &Config, remote: Arc<dyn RemoteExecutor>, logger: &Logger) -> Self {
        Self {
            remote,
            commands: BenchmarkCommands::from_config(config),
            nodes: config.nodes.clone(),
            workers: config.setup_workers.max(1),
            command_timeout: config.dispatch_timeout(),
            settle_delay: config.settle_delay(),
            logger: logger.named("FLEET"),
        }
    }

    /// Kill leftover benchmark processes on every node, then settle
    pub async fn cleanup(&self) -> usize {
        self.logger.info("Cleaning up test processes...").log().await;
        let reached = self.broadcast(&self.commands.kill_all()).await;
        tokio::time::sleep(self.settle_delay).await;
        reached
    }

    /// Create the remote working directory fresh on every node, then settle
    pub async fn prepare_workspaces(&self) -> usize {
        self.logger
            .info("Creating remote working directories")
            .field("remote_dir", self.commands.remote_dir())
            .log()
            .await;
        let reached = self.broadcast(&self.commands.prepare_workspace()).await;
        tokio::time::sleep(self.settle_delay).await;
        reached
    }

    /// Returns how many nodes accepted the command
    async fn broadcast(&self, command: &str) -> usize {
        let reached = AtomicUsize::new(0);

        stream::iter(self.nodes.iter())
            .for_each_concurrent(self.workers, |host| {
                let reached = &reached;
                async move {
                    match self.remote.run(host, command, self.command_timeout).await {
                        Ok(output) if output.is_success() => {
                            reached.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(output) => {
                            self.logger
                                .warn(&format!(
                                    "Command on {} exited with {:?}",
                                    host, output.exit_code
                                ))
                                .field("host", host)
                                .field("stderr", output.stderr.trim())
                                .log()
                                .await;
                        }
                        Err(e) => {
                            self.logger
                                .warn(&format!("Command on {} failed: {}", host, e))
                                .field("host", host)
                                .error_info(&e)
                                .log()
                                .await;
                        }
                    }
                }
            })
            .await;

        let reached = reached.into_inner();
        self.logger
            .debug(&format!("Command reached {}/{} nodes", reached, self.nodes.len()))
            .log()
            .await;
        reached
    }
}
