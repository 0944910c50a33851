//! Configuration management module

pub mod env;
pub mod nodes;
pub mod parser;

// Re-export main functionality
pub use env::EnvManager;
pub use nodes::{load_nodes, NodeSource};
pub use parser::{display_config_summary, load_config, ConfigParser, LoadedConfig};

// Re-export from models for convenience
pub use crate::models::Config;
