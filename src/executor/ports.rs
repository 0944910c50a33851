//! Shared ephemeral port pool
//!
//! Ports are borrowed for the span of one job dispatch through a
//! [`PortLease`], which returns its port when dropped so every exit path of a
//! job (success, error, cancellation) gives the port back. The pool lock is
//! held only while the free list is mutated.

use crate::error::{AppError, Result};
use crate::models::Config;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug)]
struct PoolState {
    free: Vec<u16>,
    leased: HashSet<u16>,
}

/// Pool of benchmark ports in `[min_port, max_port]`
#[derive(Debug)]
pub struct PortAllocator {
    min_port: u16,
    max_port: u16,
    state: Mutex<PoolState>,
}

impl PortAllocator {
    pub fn new(min_port: u16, max_port: u16) -> Result<Self> {
        if min_port > max_port {
            return Err(AppError::validation(format!(
                "Invalid port range {}-{}",
                min_port, max_port
            )));
        }

        Ok(Self {
            min_port,
            max_port,
            state: Mutex::new(PoolState {
                free: (min_port..=max_port).collect(),
                leased: HashSet::new(),
            }),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.min_port, config.max_port)
    }

    /// Borrow a port exclusively until the returned lease is dropped
    pub fn acquire(self: &Arc<Self>) -> Result<PortLease> {
        let port = {
            let mut state = self.state.lock();
            let port = state.free.pop().ok_or_else(|| {
                AppError::pool_exhausted(format!(
                    "No available ports in {}-{}",
                    self.min_port, self.max_port
                ))
            })?;
            state.leased.insert(port);
            port
        };

        Ok(PortLease {
            port,
            pool: Arc::clone(self),
            released: false,
        })
    }

    /// Return a leased port to the pool.
    ///
    /// Returns `false` without touching the pool when the port is not
    /// currently leased, so a second release of the same borrow is a no-op.
    pub fn release(&self, port: u16) -> bool {
        let mut state = self.state.lock();
        if state.leased.remove(&port) {
            state.free.push(port);
            true
        } else {
            false
        }
    }

    pub fn capacity(&self) -> usize {
        (self.max_port - self.min_port) as usize + 1
    }

    pub fn available(&self) -> usize {
        self.state.lock().free.len()
    }

    pub fn leased(&self) -> usize {
        self.state.lock().leased.len()
    }

    pub fn range(&self) -> (u16, u16) {
        (self.min_port, self.max_port)
    }
}

/// Exclusive borrow of one port
#[derive(Debug)]
pub struct PortLease {
    port: u16,
    pool: Arc<PortAllocator>,
    released: bool,
}

impl PortLease {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Give the port back early; dropping the lease does the same
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            self.pool.release(self.port);
        }
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        self.release_inner();
    }
}
