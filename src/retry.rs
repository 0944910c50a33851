//! Retry passes over failed node pairs
//!
//! The retry key is the (source, destination) node pair only. One failed
//! interface therefore re-runs every interface of that pair, including the
//! ones that already passed.

use crate::{
    collector::{dataset, ResultCollector},
    error::Result,
    executor::{BatchSummary, ExecutionEngine, FleetOperations},
    logging::Logger,
    models::{TestReport, TestResult},
    topology::{BatchScheduler, TestPair},
};
use std::collections::HashSet;

/// Distinct (source, destination) pairs of `failed`, in first-seen order
pub fn derive_retry_pairs(failed: &[TestResult]) -> Vec<TestPair> {
    let mut seen = HashSet::new();
    failed
        .iter()
        .map(TestResult::node_pair)
        .filter(|pair| seen.insert(pair.clone()))
        .collect()
}

/// Ordinal label for a retry pass: "First", "Second", ...
pub fn pass_label(attempt: u32) -> String {
    const LABELS: [&str; 5] = ["First", "Second", "Third", "Fourth", "Fifth"];
    match LABELS.get(attempt.saturating_sub(1) as usize) {
        Some(label) => label.to_string(),
        None => format!("#{}", attempt),
    }
}

/// What one scheduling pass (initial or retry) did and found
#[derive(Debug, Clone)]
pub struct PassSummary {
    pub label: String,
    pub pairs: usize,
    pub dispatch: BatchSummary,
    /// `None` when the pass was skipped because nothing had failed
    pub report: Option<TestReport>,
}

impl PassSummary {
    pub fn skipped(label: &str) -> Self {
        Self {
            label: label.to_string(),
            pairs: 0,
            dispatch: BatchSummary::default(),
            report: None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.report.is_none()
    }
}

/// Re-runs schedule, dispatch and collection for the pairs that failed last time
pub struct RetryCoordinator<'a> {
    fleet: &'a FleetOperations,
    engine: &'a ExecutionEngine,
    collector: &'a ResultCollector,
    show_progress: bool,
    logger: Logger,
}

impl<'a> RetryCoordinator<'a> {
    pub fn new(
        fleet: &'a FleetOperations,
        engine: &'a ExecutionEngine,
        collector: &'a ResultCollector,
        logger: &Logger,
    ) -> Self {
        Self {
            fleet,
            engine,
            collector,
            show_progress: false,
            logger: logger.named("RETRY"),
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Pairs the current failed dataset asks to retry
    pub fn pending_pairs(&self) -> Result<Vec<TestPair>> {
        let failed = dataset::read_results(&self.collector.failed_path())?;
        Ok(derive_retry_pairs(&failed))
    }

    /// One retry pass. Reads the failed dataset written by the previous collection.
    pub async fn retry_once(&self, label: &str) -> Result<PassSummary> {
        let pairs = self.pending_pairs()?;
        if pairs.is_empty() {
            self.logger
                .info(&format!("No failed test pairs, skipping {} retry", label))
                .log()
                .await;
            return Ok(PassSummary::skipped(label));
        }

        self.logger
            .info(&format!(
                "Found {} failed test pairs, starting {} retry...",
                pairs.len(),
                label
            ))
            .log()
            .await;
        self.fleet.cleanup().await;

        let total = pairs.len();
        let bar = crate::output::progress_bar(
            total as u64,
            &format!("{} retry progress", label),
            self.show_progress,
        );
        let dispatch = self
            .engine
            .execute_plan(BatchScheduler::new(pairs), &bar)
            .await;
        bar.finish();

        let report = self.collector.collect().await?;
        Ok(PassSummary {
            label: label.to_string(),
            pairs: total,
            dispatch,
            report: Some(report),
        })
    }

    /// Run `attempts` retry passes in order, labelled "First", "Second", ...
    pub async fn run(&self, attempts: u32) -> Result<Vec<PassSummary>> {
        let mut passes = Vec::with_capacity(attempts as usize);
        for attempt in 1..=attempts {
            passes.push(self.retry_once(&pass_label(attempt)).await?);
        }
        Ok(passes)
    }
}
