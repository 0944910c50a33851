//! Shared helpers for integration tests

#![allow(dead_code)]

use mesh_bandwidth_tester::{Config, TopologyMode};
use std::path::Path;

pub use mesh_bandwidth_tester::remote::testing::{FakeFleet, FAILING_OUTPUT, PASSING_OUTPUT};

/// Config with no settle pauses, a single interface and the given nodes
pub fn fast_config(nodes: &[&str], output_root: &Path) -> Config {
    Config {
        mode: TopologyMode::HalfFull,
        nodes: nodes.iter().map(|n| n.to_string()).collect(),
        interfaces: vec!["mlx5_0".to_string()],
        output_root: output_root.to_path_buf(),
        settle_delay_secs: 0,
        dispatch_timeout_secs: 1,
        batch_deadline_secs: 5,
        transfer_timeout_secs: 1,
        retry_attempts: 2,
        max_workers: Some(4),
        log_file: output_root.join("perftest.log"),
        enable_color: false,
        ..Default::default()
    }
}
