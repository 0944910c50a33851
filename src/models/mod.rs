//! Data models and structures for the mesh bandwidth tester

pub mod config;
pub mod result;

// Re-export main model types
pub use config::{Config, Secret};
pub use result::{TestReport, TestResult};
