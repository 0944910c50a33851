//! Node list file loading

use crate::error::{AppError, Result};
use std::io::ErrorKind;
use std::path::Path;

/// Where the node list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSource {
    File,
    /// File was missing; the built-in fleet was substituted
    BuiltinDefault,
}

/// Parse a node list: one address per line, trimmed, blank lines and `#` comments skipped
pub fn parse_nodes(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read the node list at `path`, falling back to the default fleet when it does not exist
pub fn load_nodes(path: &Path) -> Result<(Vec<String>, NodeSource)> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok((parse_nodes(&content), NodeSource::File)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Ok((crate::defaults::default_node_list(), NodeSource::BuiltinDefault))
        }
        Err(e) => Err(AppError::io(format!(
            "Failed to read node list {}: {}",
            path.display(),
            e
        ))),
    }
}
