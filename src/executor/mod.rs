//! Concurrent benchmark dispatch
//!
//! A batch is expanded into one job per (pair, interface). Each job borrows a
//! port, starts the benchmark server on the server node, starts the client on
//! the client node and gives the port back. Both remote commands background
//! themselves, so a finished job only means the benchmark was *launched*.
//! Whether it actually produced a bandwidth figure is decided later by the
//! result collector, which is the only source of pass/fail.

pub mod fleet;
pub mod ports;
pub mod resources;

pub use fleet::FleetOperations;
pub use ports::{PortAllocator, PortLease};
pub use resources::SystemResources;

use crate::{
    logging::Logger,
    models::Config,
    remote::{BenchmarkCommands, RemoteExecutor},
    topology::{Batch, BatchScheduler, TestPair},
};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Dispatch settings derived from [`Config`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Interfaces benchmarked for every pair
    pub interfaces: Vec<String>,
    /// Bound on issuing each remote command
    pub dispatch_timeout: Duration,
    /// Per-job wait budget measured from submission
    pub batch_deadline: Duration,
    /// Concurrent jobs
    pub workers: usize,
}

impl From<&Config> for ExecutionConfig {
    fn from(config: &Config) -> Self {
        Self {
            interfaces: config.interfaces.clone(),
            dispatch_timeout: config.dispatch_timeout(),
            batch_deadline: config.batch_deadline(),
            workers: SystemResources::resolve(config.max_workers).dispatch_workers,
        }
    }
}

/// One benchmark launch: a pair on one interface
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BenchmarkJob {
    pub pair: TestPair,
    pub interface: String,
}

/// What a job managed to do. Never a pass/fail verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Both remote commands were issued on `port`
    Issued { port: u16 },
    /// The job gave up; its artifact will simply be missing
    Failed { reason: String },
}

/// Dispatch counters for one batch, or summed over a whole pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batches: usize,
    pub pairs: usize,
    pub jobs: usize,
    pub issued: usize,
    pub failed: usize,
    /// Jobs still running when their deadline elapsed
    pub abandoned: usize,
    pub elapsed: Duration,
}

impl AddAssign for BatchSummary {
    fn add_assign(&mut self, other: Self) {
        self.batches += other.batches;
        self.pairs += other.pairs;
        self.jobs += other.jobs;
        self.issued += other.issued;
        self.failed += other.failed;
        self.abandoned += other.abandoned;
        self.elapsed += other.elapsed;
    }
}

/// Dispatches batches of benchmark jobs on a bounded worker pool
pub struct ExecutionEngine {
    remote: Arc<dyn RemoteExecutor>,
    ports: Arc<PortAllocator>,
    commands: Arc<BenchmarkCommands>,
    config: ExecutionConfig,
    concurrency_limiter: Arc<Semaphore>,
    logger: Logger,
}

impl ExecutionEngine {
    pub fn new(
        config: &Config,
        remote: Arc<dyn RemoteExecutor>,
        ports: Arc<PortAllocator>,
        logger: &Logger,
    ) -> Self {
        Self::with_execution_config(
            ExecutionConfig::from(config),
            BenchmarkCommands::from_config(config),
            remote,
            ports,
            logger,
        )
    }

    pub fn with_execution_config(
        config: ExecutionConfig,
        commands: BenchmarkCommands,
        remote: Arc<dyn RemoteExecutor>,
        ports: Arc<PortAllocator>,
        logger: &Logger,
    ) -> Self {
        let concurrency_limiter = Arc::new(Semaphore::new(config.workers.max(1)));
        Self {
            remote,
            ports,
            commands: Arc::new(commands),
            config,
            concurrency_limiter,
            logger: logger.named("EXEC"),
        }
    }

    pub fn execution_config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn ports(&self) -> &Arc<PortAllocator> {
        &self.ports
    }

    /// Cross product of the batch's pairs with the interface set
    pub fn jobs_for(&self, batch: &Batch) -> Vec<BenchmarkJob> {
        batch
            .iter()
            .flat_map(|pair| {
                self.config.interfaces.iter().map(move |interface| BenchmarkJob {
                    pair: pair.clone(),
                    interface: interface.clone(),
                })
            })
            .collect()
    }

    /// Launch every job of `batch` and wait for the launches, not the benchmarks.
    ///
    /// Each job gets `batch_deadline` from its own submission time. Jobs still
    /// pending when their budget is gone are abandoned with a warning and are
    /// not retried here; their missing artifacts surface during collection.
    pub async fn execute_batch(&self, batch: &Batch) -> BatchSummary {
        let started = Instant::now();
        let jobs = self.jobs_for(batch);
        let mut summary = BatchSummary {
            batches: 1,
            pairs: batch.len(),
            jobs: jobs.len(),
            ..Default::default()
        };

        let mut pending = Vec::with_capacity(jobs.len());
        for job in jobs {
            let remote = Arc::clone(&self.remote);
            let ports = Arc::clone(&self.ports);
            let commands = Arc::clone(&self.commands);
            let semaphore = Arc::clone(&self.concurrency_limiter);
            let logger = self.logger.clone();
            let timeout = self.config.dispatch_timeout;
            let task_job = job.clone();

            let submitted = Instant::now();
            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return DispatchOutcome::Failed {
                        reason: "worker pool closed".to_string(),
                    };
                };
                Self::dispatch_job(&*remote, &ports, &commands, &task_job, timeout, &logger).await
            });
            pending.push((job, submitted, handle));
        }

        let deadline = self.config.batch_deadline;
        for (job, submitted, mut handle) in pending {
            let waited = submitted.elapsed();
            if waited >= deadline {
                self.logger
                    .warn("Task timeout")
                    .field("pair", job.pair.to_string())
                    .field("interface", &job.interface)
                    .log()
                    .await;
                handle.abort();
                summary.abandoned += 1;
                continue;
            }

            match tokio::time::timeout(deadline - waited, &mut handle).await {
                Ok(Ok(DispatchOutcome::Issued { .. })) => summary.issued += 1,
                Ok(Ok(DispatchOutcome::Failed { .. })) => summary.failed += 1,
                Ok(Err(e)) => {
                    self.logger
                        .error(&format!("Task execution failed: {}", e))
                        .field("pair", job.pair.to_string())
                        .field("interface", &job.interface)
                        .log()
                        .await;
                    summary.failed += 1;
                }
                Err(_) => {
                    self.logger
                        .warn("Task did not complete in allowed time")
                        .field("pair", job.pair.to_string())
                        .field("interface", &job.interface)
                        .log()
                        .await;
                    handle.abort();
                    summary.abandoned += 1;
                }
            }
        }

        summary.elapsed = started.elapsed();
        self.logger
            .debug(&format!(
                "Batch dispatched: {} jobs, {} issued, {} failed, {} abandoned in {:.1}s",
                summary.jobs,
                summary.issued,
                summary.failed,
                summary.abandoned,
                summary.elapsed.as_secs_f64()
            ))
            .log()
            .await;

        summary
    }

    /// Run every batch the scheduler yields, strictly one after another
    pub async fn execute_plan(
        &self,
        scheduler: BatchScheduler,
        progress: &ProgressBar,
    ) -> BatchSummary {
        let mut total = BatchSummary::default();
        for batch in scheduler {
            let pairs: Vec<String> = batch.iter().map(ToString::to_string).collect();
            self.logger
                .debug(&format!("Batch #{}: {}", total.batches + 1, pairs.join(", ")))
                .log()
                .await;
            let summary = self.execute_batch(&batch).await;
            progress.inc(batch.len() as u64);
            progress.set_message(format!(
                "Batch #{} took {:.1}s",
                total.batches + 1,
                summary.elapsed.as_secs_f64()
            ));
            total += summary;
        }
        total
    }

    /// Launch one benchmark. Errors are logged and folded into the outcome.
    async fn dispatch_job(
        remote: &dyn RemoteExecutor,
        ports: &Arc<PortAllocator>,
        commands: &BenchmarkCommands,
        job: &BenchmarkJob,
        timeout: Duration,
        logger: &Logger,
    ) -> DispatchOutcome {
        let lease = match ports.acquire() {
            Ok(lease) => lease,
            Err(e) => {
                logger
                    .error(&format!("Test failed {}: {}", job.pair, e))
                    .field("interface", &job.interface)
                    .error_info(&e)
                    .log()
                    .await;
                return DispatchOutcome::Failed { reason: e.to_string() };
            }
        };
        let port = lease.port();

        let launches = [
            (&job.pair.server, commands.server_start(&job.interface, port)),
            (&job.pair.client, commands.client_start(&job.pair, &job.interface, port)),
        ];

        let mut failure = None;
        for (host, command) in &launches {
            logger.trace(command).field("host", host.as_str()).log().await;
            let reason = match remote.run(host, command, timeout).await {
                Ok(output) if output.is_success() => continue,
                Ok(output) => format!(
                    "exit {:?} on {}: {}",
                    output.exit_code,
                    host,
                    output.stderr.trim()
                ),
                Err(e) => e.to_string(),
            };
            logger
                .error(&format!("Test failed {}: {}", job.pair, reason))
                .field("interface", &job.interface)
                .field("host", host.as_str())
                .field("port", port)
                .log()
                .await;
            failure.get_or_insert(reason);
        }

        drop(lease);

        match failure {
            None => {
                logger
                    .debug(&format!("Launched {} on {} port {}", job.pair, job.interface, port))
                    .log()
                    .await;
                DispatchOutcome::Issued { port }
            }
            Some(reason) => DispatchOutcome::Failed { reason },
        }
    }
}
