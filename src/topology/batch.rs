//! Greedy conflict-free batch scheduling
//!
//! Two pairs conflict when they share a node. Each batch is built in one pass
//! over the remaining pairs: a pair is admitted when neither of its nodes has
//! been used in the batch yet, otherwise it is deferred to the next batch.
//! This does not minimise the number of batches but it is linear per batch and
//! deterministic for a fixed input order.

use super::pairs::TestPair;
use std::collections::HashSet;

/// A node-disjoint set of pairs that can run at the same time
pub type Batch = Vec<TestPair>;

/// Lazy iterator over conflict-free batches
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    remaining: Vec<TestPair>,
}

impl BatchScheduler {
    pub fn new(pairs: Vec<TestPair>) -> Self {
        Self { remaining: pairs }
    }

    /// Pairs not yet handed out in a batch
    pub fn pending(&self) -> usize {
        self.remaining.len()
    }
}

impl Iterator for BatchScheduler {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.remaining.is_empty() {
            return None;
        }

        let mut used: HashSet<String> = HashSet::new();
        let mut batch = Vec::new();
        let mut deferred = Vec::new();

        for pair in self.remaining.drain(..) {
            if !used.contains(&pair.client) && !used.contains(&pair.server) {
                used.insert(pair.client.clone());
                used.insert(pair.server.clone());
                batch.push(pair);
            } else {
                deferred.push(pair);
            }
        }

        self.remaining = deferred;
        Some(batch)
    }
}

/// Collect the full batch plan up front
pub fn plan_batches(pairs: Vec<TestPair>) -> Vec<Batch> {
    BatchScheduler::new(pairs).collect()
}
