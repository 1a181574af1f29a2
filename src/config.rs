use std::path::PathBuf;
use std::thread;

use tracing::warn;

use crate::error::Constraint;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: String,
    /// Scheme and authority every resource URI starts with, no trailing slash.
    pub base_url: String,
    /// Journal file; `None` keeps everything in memory.
    pub journal: Option<PathBuf>,
    pub strict_durability: bool,
    pub constraints_url: String,
    /// Assert `rdf:type memento:TimeMap` inside TimeMap RDF bodies as well as in the header.
    pub timemap_body_typing: bool,
    pub max_body_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ADDR, None)
    }
}

impl ServerConfig {
    pub fn new(addr: &str, base_url: Option<&str>) -> Self {
        let base_url = base_url.map_or_else(|| format!("http://{}", addr), |b| b.trim_end_matches('/').to_string());
        Self {
            addr: addr.to_string(),
            constraints_url: format!("{}/static/constraints", base_url),
            base_url,
            journal: None,
            strict_durability: false,
            timemap_body_typing: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn constraint_uri(&self, constraint: Constraint) -> String {
        format!("{}/{}", self.constraints_url.trim_end_matches('/'), constraint.document())
    }
}

/// Runtime sizing derived from the machine.
#[derive(Debug, Clone)]
pub struct RuntimeProfile {
    pub logical_cores: usize,
    pub worker_threads: usize,
}

impl RuntimeProfile {
    pub fn detect() -> Self {
        let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or_else(|e| {
            warn!("Could not detect available parallelism ({}), assuming one core", e);
            1
        });

        // 1 Compute + 1 I/O at minimum
        let worker_threads = if cores <= 1 { 2 } else { cores };
        Self { logical_cores: cores, worker_threads }
    }

    pub fn with_worker_threads(mut self, threads: Option<usize>) -> Self {
        if let Some(threads) = threads.filter(|t| *t > 0) {
            self.worker_threads = threads;
        }
        self
    }
}
