//! Artifact file name and content parsing

use crate::error::{AppError, Result};
use crate::models::TestResult;
use regex::Regex;
use std::path::Path;

/// Endpoints encoded in an artifact file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub source_ip: String,
    pub source_interface: String,
    pub destination_ip: String,
    pub destination_interface: String,
}

/// What reading one artifact file yielded
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactOutcome {
    /// Name and content understood; passed or failed record
    Parsed(TestResult),
    /// File name is not `{ip}_{intf}__{ip}_{intf}.txt`
    BadName,
    /// Name was fine but the file could not be read
    Unreadable(String),
    /// Not an artifact at all (wrong extension)
    Ignored,
}

/// Compiled patterns for artifact names and benchmark output
#[derive(Debug, Clone)]
pub struct ArtifactParser {
    endpoint: Regex,
    bandwidth: Regex,
}

impl ArtifactParser {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                AppError::internal(format!("Invalid artifact pattern {}: {}", pattern, e))
            })
        };
        Ok(Self {
            endpoint: compile(r"^(\d+\.\d+\.\d+\.\d+)_(.+)$")?,
            bandwidth: compile(r"=\s*([\d.]+)\s+Mbit/sec")?,
        })
    }

    /// Whether `file_name` carries the artifact extension
    pub fn is_artifact(file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .is_some_and(|ext| ext == crate::defaults::ARTIFACT_EXTENSION)
    }

    /// Split `{src}_{intf}__{dst}_{intf}.txt` into its endpoints
    pub fn parse_name(&self, file_name: &str) -> Option<ArtifactName> {
        let stem = Path::new(file_name).file_stem()?.to_str()?;

        let mut halves = stem.split("__");
        let (source, destination) = match (halves.next(), halves.next(), halves.next()) {
            (Some(source), Some(destination), None) => (source, destination),
            _ => return None,
        };

        let source = self.endpoint.captures(source)?;
        let destination = self.endpoint.captures(destination)?;

        Some(ArtifactName {
            source_ip: source[1].to_string(),
            source_interface: source[2].to_string(),
            destination_ip: destination[1].to_string(),
            destination_interface: destination[2].to_string(),
        })
    }

    /// First `= <float> Mbit/sec` figure in the benchmark output
    pub fn parse_bandwidth(&self, content: &str) -> Option<f64> {
        self.bandwidth
            .captures(content)
            .and_then(|captures| captures[1].parse().ok())
    }

    /// Turn a name plus its content into a passed or failed record
    pub fn parse(&self, name: ArtifactName, content: &str) -> TestResult {
        let ArtifactName {
            source_ip,
            source_interface,
            destination_ip,
            destination_interface,
        } = name;

        match self.parse_bandwidth(content) {
            Some(mbps) => TestResult::passed(
                source_ip,
                source_interface,
                destination_ip,
                destination_interface,
                mbps,
            ),
            None => TestResult::failed(
                source_ip,
                source_interface,
                destination_ip,
                destination_interface,
            ),
        }
    }

    /// Classify one file on disk.
    ///
    /// Content that is not valid UTF-8 is reported as unreadable.
    pub fn read(&self, path: &Path) -> ArtifactOutcome {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return ArtifactOutcome::BadName;
        };
        if !Self::is_artifact(file_name) {
            return ArtifactOutcome::Ignored;
        }
        let Some(name) = self.parse_name(file_name) else {
            return ArtifactOutcome::BadName;
        };

        let content = match std::fs::read(path) {
            Ok(bytes) => String::from_utf8(bytes),
            Err(e) => return ArtifactOutcome::Unreadable(e.to_string()),
        };
        match content {
            Ok(content) => ArtifactOutcome::Parsed(self.parse(name, &content)),
            Err(e) => ArtifactOutcome::Unreadable(e.to_string()),
        }
    }
}
