//! Test pair generation for the supported topology modes

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which node pairs get benchmarked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyMode {
    /// Every unordered pair once, as a sorted (client, server) tuple
    #[default]
    HalfFull,
    /// Every ordered pair, so each link is tested in both directions
    FullMesh,
}

impl TopologyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HalfFull => "half_full",
            Self::FullMesh => "full_mesh",
        }
    }

    /// Number of pairs this mode yields for `nodes` distinct nodes
    pub fn expected_pairs(&self, nodes: usize) -> usize {
        let ordered = nodes * nodes.saturating_sub(1);
        match self {
            Self::HalfFull => ordered / 2,
            Self::FullMesh => ordered,
        }
    }
}

impl fmt::Display for TopologyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopologyMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "half_full" | "half_mesh" => Ok(Self::HalfFull),
            "full_mesh" => Ok(Self::FullMesh),
            other => Err(AppError::config(format!(
                "Invalid topology mode '{}': expected half_full or full_mesh",
                other
            ))),
        }
    }
}

/// A directed benchmark pair: the client connects to the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestPair {
    pub client: String,
    pub server: String,
}

impl TestPair {
    pub fn new<C: Into<String>, S: Into<String>>(client: C, server: S) -> Self {
        Self {
            client: client.into(),
            server: server.into(),
        }
    }

    /// Both endpoints, client first
    pub fn nodes(&self) -> [&str; 2] {
        [&self.client, &self.server]
    }

    /// Whether the two pairs share any node
    pub fn conflicts_with(&self, other: &TestPair) -> bool {
        self.nodes().iter().any(|n| other.nodes().contains(n))
    }
}

impl fmt::Display for TestPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.client, self.server)
    }
}

impl From<(String, String)> for TestPair {
    fn from((client, server): (String, String)) -> Self {
        Self { client, server }
    }
}

/// Produce every pair to test for `nodes` in the given mode.
///
/// Output order follows the input order so batching stays deterministic.
/// Half-full pairs are written with the lexicographically smaller address as
/// client, matching how the pairs are keyed in result datasets.
pub fn generate_pairs(nodes: &[String], mode: TopologyMode) -> Vec<TestPair> {
    let mut pairs = Vec::with_capacity(mode.expected_pairs(nodes.len()));

    match mode {
        TopologyMode::FullMesh => {
            for client in nodes {
                for server in nodes {
                    if client != server {
                        pairs.push(TestPair::new(client.as_str(), server.as_str()));
                    }
                }
            }
        }
        TopologyMode::HalfFull => {
            for (i, a) in nodes.iter().enumerate() {
                for b in &nodes[i + 1..] {
                    if a == b {
                        continue;
                    }
                    let (client, server) = if a <= b { (a, b) } else { (b, a) };
                    pairs.push(TestPair::new(client.as_str(), server.as_str()));
                }
            }
        }
    }

    pairs
}
