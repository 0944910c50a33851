//! Main application orchestration and execution
//!
//! One run: create the result directory, clean and prepare every node, push
//! all pairs through batch dispatch, collect, retry failed pairs, and always
//! finish with a settle plus a fleet-wide cleanup.

use crate::{
    collector::ResultCollector,
    error::{AppError, Result},
    executor::{BatchSummary, ExecutionEngine, FleetOperations, PortAllocator},
    logging::Logger,
    models::{Config, TestReport},
    remote::{RemoteExecutor, SshExecutor},
    retry::{pass_label, PassSummary, RetryCoordinator},
    topology::{generate_pairs, plan_batches, Batch, BatchScheduler, TopologyMode},
};
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pairs and batches a run would dispatch, computed without any remote access
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub mode: TopologyMode,
    pub nodes: usize,
    pub interfaces: usize,
    pub batches: Vec<Batch>,
}

impl RunPlan {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.mode,
            nodes: config.nodes.len(),
            interfaces: config.interfaces.len(),
            batches: plan_batches(generate_pairs(&config.nodes, config.mode)),
        }
    }

    pub fn pair_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    /// Benchmark launches across the whole plan
    pub fn job_count(&self) -> usize {
        self.pair_count() * self.interfaces
    }
}

/// A top-level failure that interrupted the run after setup
#[derive(Debug, Clone)]
pub struct RunFailure {
    pub message: String,
    pub category: &'static str,
    pub exit_code: i32,
}

impl From<&AppError> for RunFailure {
    fn from(error: &AppError) -> Self {
        Self {
            message: error.to_string(),
            category: error.category(),
            exit_code: error.exit_code(),
        }
    }
}

/// Everything the run did, for the console summary
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub result_dir: PathBuf,
    pub mode: TopologyMode,
    pub nodes: usize,
    pub passes: Vec<PassSummary>,
    pub elapsed: Duration,
    pub failure: Option<RunFailure>,
}

impl RunSummary {
    /// Report of the latest pass that actually collected
    pub fn final_report(&self) -> Option<&TestReport> {
        self.passes.iter().rev().find_map(|pass| pass.report.as_ref())
    }

    pub fn exit_code(&self) -> i32 {
        self.failure.as_ref().map_or(0, |f| f.exit_code)
    }
}

/// Main application struct that coordinates all components
pub struct App {
    config: Arc<Config>,
    remote: Arc<dyn RemoteExecutor>,
    logger: Logger,
    show_progress: bool,
}

impl App {
    /// Application talking to the fleet over SSH
    pub fn new(config: Config, logger: &Logger) -> Self {
        let remote = Arc::new(SshExecutor::from_config(&config));
        Self::with_remote(config, remote, logger)
    }

    pub fn with_remote(config: Config, remote: Arc<dyn RemoteExecutor>, logger: &Logger) -> Self {
        Self {
            config: Arc::new(config),
            remote,
            logger: logger.named("APP"),
            show_progress: false,
        }
    }

    /// Draw progress bars on the terminal
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `perftest_result_<timestamp>` under the output root
    pub fn result_dir_name() -> String {
        format!("perftest_result_{}", Local::now().format("%Y-%m-%d_%H-%M-%S"))
    }

    /// Create the result directory. Failure here aborts the run.
    async fn create_result_dir(&self) -> Result<PathBuf> {
        let dir = self.config.output_root.join(Self::result_dir_name());
        match tokio::fs::create_dir_all(&dir).await {
            Ok(()) => {
                self.logger
                    .info(&format!("Created result directory: {}", dir.display()))
                    .log()
                    .await;
                Ok(dir)
            }
            Err(e) => {
                let error = AppError::setup(format!(
                    "Directory creation failed: {}: {}",
                    dir.display(),
                    e
                ));
                self.logger.error(&error.to_string()).error_info(&error).log().await;
                Err(error)
            }
        }
    }

    /// Run the whole benchmark. `Err` only for fatal setup failures; anything
    /// later is logged as critical and recorded in the summary after cleanup.
    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        let result_dir = self.create_result_dir().await?;

        let ports = Arc::new(PortAllocator::from_config(&self.config)?);
        let fleet = FleetOperations::new(&self.config, Arc::clone(&self.remote), &self.logger);
        let engine =
            ExecutionEngine::new(&self.config, Arc::clone(&self.remote), ports, &self.logger);
        let collector = ResultCollector::new(
            &self.config,
            Arc::clone(&self.remote),
            &result_dir,
            &self.logger,
        )?;

        self.logger
            .debug(&format!(
                "Dispatch workers: {}, ports: {}-{}",
                engine.execution_config().workers,
                self.config.min_port,
                self.config.max_port
            ))
            .log()
            .await;

        let mut summary = RunSummary {
            result_dir,
            mode: self.config.mode,
            nodes: self.config.nodes.len(),
            passes: Vec::new(),
            elapsed: Duration::ZERO,
            failure: None,
        };

        if let Err(e) = self.run_passes(&fleet, &engine, &collector, &mut summary.passes).await {
            self.logger
                .critical(&format!("Critical error: {}", e))
                .error_info(&e)
                .log()
                .await;
            summary.failure = Some(RunFailure::from(&e));
        }

        tokio::time::sleep(self.config.settle_delay()).await;
        fleet.cleanup().await;

        summary.elapsed = started.elapsed();
        Ok(summary)
    }

    async fn run_passes(
        &self,
        fleet: &FleetOperations,
        engine: &ExecutionEngine,
        collector: &ResultCollector,
        passes: &mut Vec<PassSummary>,
    ) -> Result<()> {
        fleet.cleanup().await;
        fleet.prepare_workspaces().await;

        let pairs = generate_pairs(&self.config.nodes, self.config.mode);
        let total = pairs.len();
        self.logger.info(&format!("Total test pairs: {}", total)).log().await;

        let bar = crate::output::progress_bar(total as u64, "Testing progress", self.show_progress);
        let dispatch = engine.execute_plan(BatchScheduler::new(pairs), &bar).await;
        bar.finish();
        self.log_dispatch(&dispatch).await;
        self.logger.info("All tests completed").log().await;

        let report = collector.collect().await?;
        passes.push(PassSummary {
            label: "Initial".to_string(),
            pairs: total,
            dispatch,
            report: Some(report),
        });

        let retry = RetryCoordinator::new(fleet, engine, collector, &self.logger)
            .with_progress(self.show_progress);
        for attempt in 1..=self.config.retry_attempts {
            passes.push(retry.retry_once(&pass_label(attempt)).await?);
        }

        Ok(())
    }

    async fn log_dispatch(&self, dispatch: &BatchSummary) {
        let builder = if dispatch.abandoned > 0 || dispatch.failed > 0 {
            self.logger.warn("Dispatch finished with problems")
        } else {
            self.logger.info("Dispatch finished")
        };
        builder
            .field("batches", dispatch.batches)
            .field("jobs", dispatch.jobs)
            .field("issued", dispatch.issued)
            .field("failed", dispatch.failed)
            .field("abandoned", dispatch.abandoned)
            .log()
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_dir_name_format() {
        let name = App::result_dir_name();
        assert!(name.starts_with("perftest_result_"));
        // perftest_result_YYYY-MM-DD_HH-MM-SS
        assert_eq!(name.len(), "perftest_result_".len() + 19);
    }

    #[test]
    fn test_run_plan_counts() {
        let config = Config {
            nodes: ["n1", "n2", "n3", "n4"].map(String::from).to_vec(),
            interfaces: vec!["mlx5_0".to_string(), "mlx5_1".to_string()],
            ..Default::default()
        };
        let plan = RunPlan::from_config(&config);
        assert_eq!(plan.pair_count(), 6);
        assert_eq!(plan.job_count(), 12);
        assert_eq!(plan.batches.len(), 3);

        let full = RunPlan::from_config(&Config {
            mode: TopologyMode::FullMesh,
            ..config
        });
        assert_eq!(full.pair_count(), 12);
    }

    #[test]
    fn test_exit_code_from_failure() {
        let mut summary = RunSummary {
            result_dir: PathBuf::from("r"),
            mode: TopologyMode::HalfFull,
            nodes: 2,
            passes: Vec::new(),
            elapsed: Duration::ZERO,
            failure: None,
        };
        assert_eq!(summary.exit_code(), 0);
        summary.failure = Some(RunFailure::from(&AppError::dataset("bad csv")));
        assert_eq!(summary.exit_code(), 5);
    }
}
