//! Benchmark result records produced during reconciliation

use crate::topology::TestPair;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One observed (source, interface) -> (destination, interface) benchmark
///
/// `bandwidth_mbps` is `None` when the artifact existed but carried no
/// bandwidth figure, which marks the observation as failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub source_ip: String,
    pub source_interface: String,
    pub destination_ip: String,
    pub destination_interface: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth_mbps: Option<f64>,
}

impl TestResult {
    pub fn passed(
        source_ip: impl Into<String>,
        source_interface: impl Into<String>,
        destination_ip: impl Into<String>,
        destination_interface: impl Into<String>,
        bandwidth_mbps: f64,
    ) -> Self {
        Self {
            source_ip: source_ip.into(),
            source_interface: source_interface.into(),
            destination_ip: destination_ip.into(),
            destination_interface: destination_interface.into(),
            bandwidth_mbps: Some(bandwidth_mbps),
        }
    }

    pub fn failed(
        source_ip: impl Into<String>,
        source_interface: impl Into<String>,
        destination_ip: impl Into<String>,
        destination_interface: impl Into<String>,
    ) -> Self {
        Self {
            source_ip: source_ip.into(),
            source_interface: source_interface.into(),
            destination_ip: destination_ip.into(),
            destination_interface: destination_interface.into(),
            bandwidth_mbps: None,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.bandwidth_mbps.is_some()
    }

    /// Node pair this result belongs to, ignoring interfaces
    pub fn node_pair(&self) -> TestPair {
        TestPair::new(self.source_ip.as_str(), self.destination_ip.as_str())
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{} -> {}_{}",
            self.source_ip, self.source_interface, self.destination_ip, self.destination_interface
        )?;
        match self.bandwidth_mbps {
            Some(mbps) => write!(f, " = {:.2} Mbit/sec", mbps),
            None => f.write_str(" (failed)"),
        }
    }
}

/// Outcome of one reconciliation pass, split into passed and failed records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub passed: Vec<TestResult>,
    pub failed: Vec<TestResult>,
}

impl TestReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a result into the collection matching its outcome
    pub fn record(&mut self, result: TestResult) {
        if result.is_passed() {
            self.passed.push(result);
        } else {
            self.failed.push(result);
        }
    }

    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Passed share in percent; 0 for an empty report
    pub fn pass_rate(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.passed.len() as f64 / self.total() as f64 * 100.0
        }
    }
}

impl Extend<TestResult> for TestReport {
    fn extend<I: IntoIterator<Item = TestResult>>(&mut self, iter: I) {
        for result in iter {
            self.record(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_splits_by_outcome() {
        let mut report = TestReport::new();
        report.record(TestResult::passed("10.0.0.1", "mlx5_0", "10.0.0.2", "mlx5_0", 95.32));
        report.record(TestResult::failed("10.0.0.1", "mlx5_1", "10.0.0.2", "mlx5_1"));
        report.record(TestResult::failed("10.0.0.3", "mlx5_1", "10.0.0.4", "mlx5_1"));

        assert_eq!(report.passed.len(), 1);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.total(), 3);
        assert!((report.pass_rate() - 33.333).abs() < 0.01);
    }

    #[test]
    fn test_empty_report() {
        let report = TestReport::default();
        assert!(report.is_empty());
        assert_eq!(report.pass_rate(), 0.0);
    }

    #[test]
    fn test_node_pair_drops_interfaces() {
        let result = TestResult::failed("10.0.0.1", "mlx5_4", "10.0.0.2", "mlx5_4");
        assert_eq!(result.node_pair(), TestPair::new("10.0.0.1", "10.0.0.2"));
    }

    #[test]
    fn test_display() {
        let passed = TestResult::passed("a", "mlx5_0", "b", "mlx5_0", 1.5);
        assert_eq!(passed.to_string(), "a_mlx5_0 -> b_mlx5_0 = 1.50 Mbit/sec");
        let failed = TestResult::failed("a", "mlx5_0", "b", "mlx5_0");
        assert!(failed.to_string().ends_with("(failed)"));
    }
}
