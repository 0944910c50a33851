//! Pair generation and conflict-free batch scheduling

pub mod batch;
pub mod pairs;

pub use batch::{plan_batches, Batch, BatchScheduler};
pub use pairs::{generate_pairs, TestPair, TopologyMode};
