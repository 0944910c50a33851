//! Worker pool sizing from system resources

/// System resource information used to size the dispatch pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemResources {
    /// Number of logical CPU cores
    pub cpu_cores: usize,
    /// Concurrent benchmark dispatches allowed
    pub dispatch_workers: usize,
}

impl SystemResources {
    /// Detect system resources and derive the dispatch pool size
    pub fn detect() -> Self {
        let cpu_cores = num_cpus::get();
        Self {
            cpu_cores,
            dispatch_workers: Self::workers_for(cpu_cores),
        }
    }

    /// Dispatch is I/O bound: two workers per core, capped
    pub fn workers_for(cpu_cores: usize) -> usize {
        (cpu_cores * 2).clamp(1, crate::defaults::MAX_DISPATCH_WORKERS)
    }

    /// Apply an explicit override, falling back to detection
    pub fn resolve(max_workers: Option<usize>) -> Self {
        let mut resources = Self::detect();
        if let Some(workers) = max_workers {
            resources.dispatch_workers = workers.max(1);
        }
        resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_resources_detection() {
        let resources = SystemResources::detect();
        assert!(resources.cpu_cores > 0);
        assert!(resources.dispatch_workers >= 2);
        assert!(resources.dispatch_workers <= 128);
    }

    #[test]
    fn test_workers_for_caps_at_128() {
        assert_eq!(SystemResources::workers_for(1), 2);
        assert_eq!(SystemResources::workers_for(16), 32);
        assert_eq!(SystemResources::workers_for(64), 128);
        assert_eq!(SystemResources::workers_for(256), 128);
    }

    #[test]
    fn test_resolve_override() {
        assert_eq!(SystemResources::resolve(Some(7)).dispatch_workers, 7);
        assert_eq!(
            SystemResources::resolve(None).dispatch_workers,
            SystemResources::detect().dispatch_workers
        );
    }
}
