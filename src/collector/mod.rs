//! Result reconciliation
//!
//! Dispatch only proves a benchmark was launched. The collector is where
//! pass/fail is decided: it pulls every node's artifact directory into the
//! run's result tree, parses each artifact and writes the passed and failed
//! datasets.
//!
//! Local layout under the result directory:
//!
//! ```text
//! perftest_result_<timestamp>/
//!   rdma_analysis_passed.csv
//!   rdma_analysis_failed.csv
//!   rping_results/<node>/<client>_<intf>__<server>_<intf>.txt
//! ```

pub mod artifact;
pub mod dataset;

pub use artifact::{ArtifactName, ArtifactOutcome, ArtifactParser};

use crate::{
    error::{AppError, ErrorContext, Result},
    logging::Logger,
    models::{Config, TestReport},
    remote::RemoteExecutor,
};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Fetches, parses and persists benchmark artifacts for one run
pub struct ResultCollector {
    remote: Arc<dyn RemoteExecutor>,
    nodes: Vec<String>,
    remote_dir: String,
    result_dir: PathBuf,
    workers: usize,
    transfer_timeout: Duration,
    settle_delay: Duration,
    parser: ArtifactParser,
    logger: Logger,
}

impl ResultCollector {
    pub fn new(
        config: &Config,
        remote: Arc<dyn RemoteExecutor>,
        result_dir: impl Into<PathBuf>,
        logger: &Logger,
    ) -> Result<Self> {
        Ok(Self {
            remote,
            nodes: config.nodes.clone(),
            remote_dir: config.remote_dir.clone(),
            result_dir: result_dir.into(),
            workers: config.transfer_workers.max(1),
            transfer_timeout: config.transfer_timeout(),
            settle_delay: config.settle_delay(),
            parser: ArtifactParser::new()?,
            logger: logger.named("COLLECT"),
        })
    }

    pub fn result_dir(&self) -> &Path {
        &self.result_dir
    }

    /// Local root of fetched raw artifacts
    pub fn artifact_dir(&self) -> PathBuf {
        self.result_dir.join(crate::defaults::ARTIFACT_DIR)
    }

    pub fn passed_path(&self) -> PathBuf {
        self.result_dir.join(crate::defaults::PASSED_DATASET)
    }

    pub fn failed_path(&self) -> PathBuf {
        self.result_dir.join(crate::defaults::FAILED_DATASET)
    }

    /// Settle, fetch every node's artifacts, parse them and rewrite both datasets
    pub async fn collect(&self) -> Result<TestReport> {
        tokio::time::sleep(self.settle_delay).await;

        self.logger.info("Starting log file collection").log().await;
        let fetched = self.fetch_all().await?;
        self.logger
            .info("Log file collection completed")
            .field("nodes", fetched)
            .field("total_nodes", self.nodes.len())
            .log()
            .await;

        let report = self.process_artifacts(&self.artifact_dir()).await?;
        self.write_datasets(&report).await?;
        Ok(report)
    }

    /// Copy each node's remote directory into `rping_results/<node>`.
    ///
    /// Per-node failures are logged and skipped; returns nodes fetched.
    pub async fn fetch_all(&self) -> Result<usize> {
        let root = self.artifact_dir();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Creating artifact directory {}", root.display()))?;

        let fetched = AtomicUsize::new(0);
        stream::iter(self.nodes.iter())
            .for_each_concurrent(self.workers, |host| {
                let fetched = &fetched;
                let local = root.join(host);
                async move {
                    if let Err(e) = tokio::fs::create_dir_all(&local).await {
                        self.logger
                            .error(&format!("Failed to create {}: {}", local.display(), e))
                            .log()
                            .await;
                        return;
                    }

                    match self
                        .remote
                        .fetch(host, &self.remote_dir, &local, self.transfer_timeout)
                        .await
                    {
                        Ok(()) => {
                            fetched.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) if e.category() == "TIMEOUT" => {
                            self.logger
                                .error(&format!("File collection timeout from node {}", host))
                                .error_info(&e)
                                .log()
                                .await;
                        }
                        Err(e) => {
                            self.logger
                                .error(&format!(
                                    "Failed to collect files from node {}: {}",
                                    host, e
                                ))
                                .error_info(&e)
                                .log()
                                .await;
                        }
                    }
                }
            })
            .await;

        Ok(fetched.into_inner())
    }

    /// Parse every artifact below `dir` into a report.
    ///
    /// Bad file names and unreadable files are logged and left out of both
    /// collections; only readable artifacts with a well-formed name count.
    /// The directory walk and file reads run on the blocking pool.
    pub async fn process_artifacts(&self, dir: &Path) -> Result<TestReport> {
        let parser = self.parser.clone();
        let dir = dir.to_path_buf();
        let outcomes = tokio::task::spawn_blocking(move || {
            artifact_files(&dir)
                .into_iter()
                .map(|path| {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    (file_name, parser.read(&path))
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| AppError::internal(format!("Artifact parsing task failed: {}", e)))?;

        let mut report = TestReport::new();
        for (file_name, outcome) in outcomes {
            match outcome {
                ArtifactOutcome::Parsed(result) => report.record(result),
                ArtifactOutcome::BadName => {
                    self.logger
                        .warn(&format!("Invalid filename format: {}", file_name))
                        .log()
                        .await;
                }
                ArtifactOutcome::Unreadable(reason) => {
                    self.logger
                        .error(&format!("Failed to read file {}: {}", file_name, reason))
                        .log()
                        .await;
                }
                ArtifactOutcome::Ignored => {}
            }
        }

        self.logger
            .debug(&format!(
                "Parsed {} artifacts: {} passed, {} failed",
                report.total(),
                report.passed.len(),
                report.failed.len()
            ))
            .log()
            .await;

        Ok(report)
    }

    /// Write non-empty collections; remove datasets an earlier pass left behind
    pub async fn write_datasets(&self, report: &TestReport) -> Result<()> {
        let passed_path = self.passed_path();
        if report.passed.is_empty() {
            dataset::remove(&passed_path)?;
            self.logger.warn("No valid data found").log().await;
        } else {
            dataset::write_passed(&passed_path, &report.passed)?;
            self.logger
                .info(&format!("Analysis results saved to {}", passed_path.display()))
                .field("rows", report.passed.len())
                .log()
                .await;
        }

        let failed_path = self.failed_path();
        if report.failed.is_empty() {
            if dataset::remove(&failed_path)? {
                self.logger
                    .info("No failed results; removed previous failed dataset")
                    .log()
                    .await;
            } else {
                self.logger.info("No failed results").log().await;
            }
        } else {
            dataset::write_failed(&failed_path, &report.failed)?;
            self.logger
                .info(&format!("Failed results saved to {}", failed_path.display()))
                .field("rows", report.failed.len())
                .log()
                .await;
        }

        Ok(())
    }
}

/// Every regular file below `dir`, depth first, in name order
fn artifact_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&current) else {
            continue;
        };
        let mut paths: Vec<PathBuf> =
            entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        paths.sort();
        for path in paths {
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestResult;
    use crate::remote::testing::{FakeFleet, FAILING_OUTPUT, PASSING_OUTPUT};
    use tempfile::TempDir;

    fn config(nodes: &[&str]) -> Config {
        Config {
            nodes: nodes.iter().map(|s| s.to_string()).collect(),
            settle_delay_secs: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_collect_splits_passed_and_failed() {
        let dir = TempDir::new().unwrap();
        let fleet = Arc::new(FakeFleet::new());
        let name = |client: &str, intf: &str, server: &str| {
            format!("{}_{}__{}_{}.txt", client, intf, server, intf)
        };
        fleet.put_artifact(
            "10.0.0.1",
            &name("10.0.0.1", "mlx5_0", "10.0.0.2"),
            "... = 95.32 Mbit/sec ...",
        );
        fleet.put_artifact("10.0.0.1", &name("10.0.0.1", "mlx5_1", "10.0.0.2"), FAILING_OUTPUT);
        fleet.put_artifact("10.0.0.3", &name("10.0.0.3", "mlx5_0", "10.0.0.4"), PASSING_OUTPUT);
        fleet.put_artifact("10.0.0.3", "garbage.txt", PASSING_OUTPUT);

        let collector = ResultCollector::new(
            &config(&["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"]),
            fleet,
            dir.path(),
            &Logger::discard(),
        )
        .unwrap();

        let report = collector.collect().await.unwrap();
        assert_eq!(report.passed.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(report
            .passed
            .iter()
            .any(|r| r.source_ip == "10.0.0.1" && r.bandwidth_mbps == Some(95.32)));
        assert_eq!(report.failed[0].source_interface, "mlx5_1");

        let fetched = dir.path().join("rping_results/10.0.0.1");
        assert!(fetched.join(name("10.0.0.1", "mlx5_0", "10.0.0.2")).exists());
        assert_eq!(dataset::read_results(&collector.passed_path()).unwrap().len(), 2);
        assert_eq!(dataset::read_results(&collector.failed_path()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_node_is_skipped() {
        let dir = TempDir::new().unwrap();
        let fleet = Arc::new(FakeFleet::new());
        fleet.put_artifact("10.0.0.1", "10.0.0.1_mlx5_0__10.0.0.2_mlx5_0.txt", PASSING_OUTPUT);
        fleet.put_artifact("10.0.0.3", "10.0.0.3_mlx5_0__10.0.0.4_mlx5_0.txt", PASSING_OUTPUT);
        fleet.set_unreachable("10.0.0.3");

        let collector = ResultCollector::new(
            &config(&["10.0.0.1", "10.0.0.3"]),
            fleet,
            dir.path(),
            &Logger::discard(),
        )
        .unwrap();

        assert_eq!(collector.fetch_all().await.unwrap(), 1);
        let report = collector
            .process_artifacts(&collector.artifact_dir())
            .await
            .unwrap();
        assert_eq!(report.passed.len(), 1);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_clean_pass_removes_stale_failed_dataset() {
        let dir = TempDir::new().unwrap();
        let collector = ResultCollector::new(
            &config(&["10.0.0.1", "10.0.0.2"]),
            Arc::new(FakeFleet::new()),
            dir.path(),
            &Logger::discard(),
        )
        .unwrap();

        let mut first = TestReport::new();
        first.record(TestResult::failed("10.0.0.1", "mlx5_0", "10.0.0.2", "mlx5_0"));
        collector.write_datasets(&first).await.unwrap();
        assert!(collector.failed_path().exists());
        assert!(!collector.passed_path().exists());

        let mut second = TestReport::new();
        second.record(TestResult::passed("10.0.0.1", "mlx5_0", "10.0.0.2", "mlx5_0", 90.0));
        collector.write_datasets(&second).await.unwrap();
        assert!(!collector.failed_path().exists());
        assert!(collector.passed_path().exists());
    }

    #[tokio::test]
    async fn test_non_utf8_artifact_is_left_out_of_report() {
        let dir = TempDir::new().unwrap();
        let collector = ResultCollector::new(
            &config(&["10.0.0.1", "10.0.0.2"]),
            Arc::new(FakeFleet::new()),
            dir.path(),
            &Logger::discard(),
        )
        .unwrap();

        let node_dir = collector.artifact_dir().join("10.0.0.1");
        std::fs::create_dir_all(&node_dir).unwrap();
        std::fs::write(node_dir.join("10.0.0.1_mlx5_0__10.0.0.2_mlx5_0.txt"), [0xff, 0xfe, b'x'])
            .unwrap();
        std::fs::write(node_dir.join("10.0.0.1_mlx5_1__10.0.0.2_mlx5_1.txt"), PASSING_OUTPUT)
            .unwrap();

        let report = collector
            .process_artifacts(&collector.artifact_dir())
            .await
            .unwrap();
        assert_eq!(report.total(), 1);
        assert_eq!(report.passed[0].source_interface, "mlx5_1");
    }

    #[test]
    fn test_artifact_files_walks_nested_dirs() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/one.txt"), "").unwrap();
        std::fs::write(dir.path().join("a/b/two.txt"), "").unwrap();
        std::fs::write(dir.path().join("three.txt"), "").unwrap();

        let files = artifact_files(dir.path());
        assert_eq!(files.len(), 3);
        assert!(artifact_files(&dir.path().join("missing")).is_empty());
    }
}
