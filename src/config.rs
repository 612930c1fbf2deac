//! Runtime configuration for the preprocessing core

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default neighbor threshold in kilometers
pub const DEFAULT_NEIGHBOR_THRESHOLD_KM: f64 = 200.0;

/// Default minimum cluster size
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 2;

/// Default ingestion concurrency limit
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 5;

/// Tunables consumed by the preprocessing core.
///
/// Deserializes from JSON with per-field defaults, so a config file only
/// needs to name the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum centroid distance for two regions to count as neighbors
    #[serde(default = "default_neighbor_threshold_km")]
    pub neighbor_threshold_km: f64,
    /// Smallest connected component kept as a market cluster
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,
    /// Concurrent task cap for the ingestion queue
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
}

fn default_neighbor_threshold_km() -> f64 {
    DEFAULT_NEIGHBOR_THRESHOLD_KM
}

fn default_min_cluster_size() -> usize {
    DEFAULT_MIN_CLUSTER_SIZE
}

fn default_concurrency_limit() -> usize {
    DEFAULT_CONCURRENCY_LIMIT
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            neighbor_threshold_km: DEFAULT_NEIGHBOR_THRESHOLD_KM,
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
        }
    }
}

impl AnalysisConfig {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the neighbor distance threshold in kilometers
    pub fn with_neighbor_threshold_km(mut self, km: f64) -> Self {
        self.neighbor_threshold_km = km;
        self
    }

    /// Set the minimum cluster size
    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = size;
        self
    }

    /// Set the ingestion concurrency limit
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    /// Load configuration from a JSON file; absent fields take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))
    }
}
