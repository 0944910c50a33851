//! Console output: progress bars, the dry-run plan and the end-of-run summary

use crate::app::{RunPlan, RunSummary};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as _;

/// Pair-count progress bar; hidden when `visible` is false
pub fn progress_bar(total: u64, prefix: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(
                "{prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pairs ({eta}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    bar.set_prefix(prefix.to_string());
    bar
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            muted: Color::BrightBlack,
        }
    }
}

/// Renders plans and run summaries for the terminal
pub struct SummaryFormatter {
    use_color: bool,
    scheme: ColorScheme,
}

impl SummaryFormatter {
    pub fn new(use_color: bool) -> Self {
        Self {
            use_color,
            scheme: ColorScheme::default(),
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.use_color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn header(&self, text: &str) -> String {
        if self.use_color {
            text.color(self.scheme.header).bold().to_string()
        } else {
            text.to_string()
        }
    }

    /// Batch plan printed by `--dry-run`
    pub fn format_plan(&self, plan: &RunPlan) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.header("Dry run: batch plan"));
        let _ = writeln!(out, "  Mode:        {}", plan.mode);
        let _ = writeln!(out, "  Nodes:       {}", plan.nodes);
        let _ = writeln!(out, "  Interfaces:  {}", plan.interfaces);
        let _ = writeln!(out, "  Total test pairs: {}", plan.pair_count());
        let _ = writeln!(out, "  Batches:     {}", plan.batches.len());
        let _ = writeln!(out, "  Jobs:        {}", plan.job_count());

        for (index, batch) in plan.batches.iter().enumerate() {
            let pairs: Vec<String> = batch.iter().map(ToString::to_string).collect();
            let _ = writeln!(
                out,
                "  {} {}",
                self.paint(&format!("Batch #{:<3}", index + 1), self.scheme.muted),
                pairs.join(", ")
            );
        }

        out
    }

    /// End-of-run summary: one line per pass, then the final verdict
    pub fn format_run(&self, summary: &RunSummary) -> String {
        let mut out = String::new();
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.header("Run summary"));
        let _ = writeln!(out, "  Mode:       {}", summary.mode);
        let _ = writeln!(out, "  Nodes:      {}", summary.nodes);
        let _ = writeln!(out, "  Results:    {}", summary.result_dir.display());
        let _ = writeln!(out, "  Elapsed:    {:.1}s", summary.elapsed.as_secs_f64());
        let _ = writeln!(out);

        for pass in &summary.passes {
            match &pass.report {
                None => {
                    let _ = writeln!(
                        out,
                        "  {:<8} {}",
                        pass.label,
                        self.paint("skipped, nothing failed", self.scheme.muted)
                    );
                }
                Some(report) => {
                    let failed = format!("{} failed", report.failed.len());
                    let failed = if report.failed.is_empty() {
                        self.paint(&failed, self.scheme.success)
                    } else {
                        self.paint(&failed, self.scheme.error)
                    };
                    let _ = write!(
                        out,
                        "  {:<8} {} pairs in {} batches: {}, {}",
                        pass.label,
                        pass.pairs,
                        pass.dispatch.batches,
                        self.paint(&format!("{} passed", report.passed.len()), self.scheme.success),
                        failed
                    );
                    if pass.dispatch.abandoned > 0 {
                        let _ = write!(
                            out,
                            ", {}",
                            self.paint(
                                &format!("{} launches abandoned", pass.dispatch.abandoned),
                                self.scheme.warning
                            )
                        );
                    }
                    let _ = writeln!(out);
                }
            }
        }

        let _ = writeln!(out);
        match (&summary.failure, summary.final_report()) {
            (Some(failure), _) => {
                let _ = writeln!(
                    out,
                    "  {}",
                    self.paint(
                        &format!("[{}] {}", failure.category, failure.message),
                        self.scheme.error
                    )
                );
            }
            (None, Some(report)) if report.failed.is_empty() => {
                let line = self.paint("All collected links passed", self.scheme.success);
                let _ = writeln!(out, "  {}", line);
            }
            (None, Some(report)) => {
                let _ = writeln!(
                    out,
                    "  {}",
                    self.paint(
                        &format!(
                            "{} links still failing ({:.1}% pass rate)",
                            report.failed.len(),
                            report.pass_rate()
                        ),
                        self.scheme.warning
                    )
                );
            }
            (None, None) => {
                let line = self.paint("No results collected", self.scheme.warning);
                let _ = writeln!(out, "  {}", line);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::BatchSummary;
    use crate::models::{Config, TestReport, TestResult};
    use crate::retry::PassSummary;
    use crate::topology::TopologyMode;
    use std::path::PathBuf;
    use std::time::Duration;

    fn summary(passes: Vec<PassSummary>) -> RunSummary {
        RunSummary {
            result_dir: PathBuf::from("perftest_result_2026-01-01_00-00-00"),
            mode: TopologyMode::HalfFull,
            nodes: 4,
            passes,
            elapsed: Duration::from_secs(42),
            failure: None,
        }
    }

    fn pass(label: &str, passed: usize, failed: usize) -> PassSummary {
        let mut report = TestReport::new();
        for _ in 0..passed {
            report.record(TestResult::passed("a", "x", "b", "x", 90.0));
        }
        for _ in 0..failed {
            report.record(TestResult::failed("a", "y", "b", "y"));
        }
        PassSummary {
            label: label.to_string(),
            pairs: 6,
            dispatch: BatchSummary {
                batches: 3,
                ..Default::default()
            },
            report: Some(report),
        }
    }

    #[test]
    fn test_plan_lists_every_batch() {
        let config = Config {
            nodes: ["n1", "n2", "n3", "n4"].map(String::from).to_vec(),
            ..Default::default()
        };
        let text = SummaryFormatter::new(false).format_plan(&RunPlan::from_config(&config));

        assert!(text.contains("Total test pairs: 6"));
        assert!(text.contains("Batch #1"));
        assert!(text.contains("n1->n2, n3->n4"));
        assert!(text.contains("Batch #3"));
        assert!(!text.contains("Batch #4"));
    }

    #[test]
    fn test_run_summary_plain() {
        let text = SummaryFormatter::new(false).format_run(&summary(vec![
            pass("Initial", 40, 8),
            pass("First", 47, 1),
            PassSummary::skipped("Second"),
        ]));

        assert!(text.contains("Initial  6 pairs in 3 batches: 40 passed, 8 failed"));
        assert!(text.contains("Second   skipped"));
        assert!(text.contains("1 links still failing"));
        assert!(!text.contains("\x1b["));
    }

    #[test]
    fn test_run_summary_reports_failure() {
        let mut run = summary(vec![pass("Initial", 1, 0)]);
        run.failure = Some((&crate::error::AppError::dataset("broken csv")).into());
        let text = SummaryFormatter::new(false).format_run(&run);
        assert!(text.contains("[DATASET]"));
    }

    #[test]
    fn test_hidden_progress_bar() {
        let bar = progress_bar(10, "Testing progress", false);
        bar.inc(3);
        assert!(bar.is_hidden());
    }
}
