//! Passed/failed CSV datasets
//!
//! Passed rows carry `bandwidth_mbps`; failed rows stop after the destination
//! interface. Both read back into [`TestResult`].

use crate::error::{AppError, Result};
use crate::models::TestResult;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct PassedRow<'a> {
    source_ip: &'a str,
    source_interface: &'a str,
    destination_ip: &'a str,
    destination_interface: &'a str,
    bandwidth_mbps: f64,
}

#[derive(Serialize)]
struct FailedRow<'a> {
    source_ip: &'a str,
    source_interface: &'a str,
    destination_ip: &'a str,
    destination_interface: &'a str,
}

fn dataset_error(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::dataset(format!("{}: {}", path.display(), e))
}

/// Overwrite `path` with the passed records. Records without bandwidth are skipped.
pub fn write_passed(path: &Path, results: &[TestResult]) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| dataset_error(path, e))?;
    let mut written = 0;
    for result in results {
        let Some(bandwidth_mbps) = result.bandwidth_mbps else {
            continue;
        };
        writer
            .serialize(PassedRow {
                source_ip: &result.source_ip,
                source_interface: &result.source_interface,
                destination_ip: &result.destination_ip,
                destination_interface: &result.destination_interface,
                bandwidth_mbps,
            })
            .map_err(|e| dataset_error(path, e))?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Overwrite `path` with the failed records
pub fn write_failed(path: &Path, results: &[TestResult]) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| dataset_error(path, e))?;
    for result in results {
        writer
            .serialize(FailedRow {
                source_ip: &result.source_ip,
                source_interface: &result.source_interface,
                destination_ip: &result.destination_ip,
                destination_interface: &result.destination_interface,
            })
            .map_err(|e| dataset_error(path, e))?;
    }
    writer.flush()?;
    Ok(results.len())
}

/// Read either dataset. A missing file is an empty dataset.
pub fn read_results(path: &Path) -> Result<Vec<TestResult>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| dataset_error(path, e))?;
    reader
        .deserialize()
        .map(|row| row.map_err(|e| dataset_error(path, e)))
        .collect()
}

/// Remove a dataset left by an earlier pass; absent files are fine
pub fn remove(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sorted(mut results: Vec<TestResult>) -> Vec<TestResult> {
        results.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        results
    }

    #[test]
    fn test_passed_dataset_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("passed.csv");
        let results = vec![
            TestResult::passed("10.0.0.1", "mlx5_0", "10.0.0.2", "mlx5_0", 95.32),
            TestResult::passed("10.0.0.3", "mlx5_11", "10.0.0.4", "mlx5_11", 23456.7),
        ];

        assert_eq!(write_passed(&path, &results).unwrap(), 2);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().next().unwrap(),
            "source_ip,source_interface,destination_ip,destination_interface,bandwidth_mbps"
        );
        assert_eq!(sorted(read_results(&path).unwrap()), sorted(results));
    }

    #[test]
    fn test_failed_dataset_has_no_bandwidth_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed.csv");
        let results = vec![
            TestResult::failed("10.0.0.1", "mlx5_0", "10.0.0.2", "mlx5_0"),
            TestResult::failed("10.0.0.1", "mlx5_1", "10.0.0.2", "mlx5_1"),
        ];

        write_failed(&path, &results).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().next().unwrap(),
            "source_ip,source_interface,destination_ip,destination_interface"
        );
        assert_eq!(content.lines().count(), 3);

        let read = read_results(&path).unwrap();
        assert_eq!(read, results);
        assert!(read.iter().all(|r| !r.is_passed()));
    }

    #[test]
    fn test_missing_dataset_reads_empty() {
        let dir = TempDir::new().unwrap();
        assert!(read_results(&dir.path().join("absent.csv")).unwrap().is_empty());
        assert!(!remove(&dir.path().join("absent.csv")).unwrap());
    }

    #[test]
    fn test_malformed_dataset_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.csv");
        std::fs::write(&path, "source_ip,destination_ip\n10.0.0.1,10.0.0.2\n").unwrap();
        let err = read_results(&path).unwrap_err();
        assert_eq!(err.category(), "DATASET");
    }
}
