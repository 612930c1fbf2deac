use std::path::{Path, PathBuf};

/// Default data directory (relative to current working directory)
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Base dataset file names within the data directory
pub const GEO_BOUNDARIES_FILE: &str = "geo_boundaries.json";
pub const TRADE_FLOWS_FILE: &str = "trade_flows.csv";
pub const TIME_SERIES_FILE: &str = "time_series.json";
pub const SPATIAL_WEIGHTS_FILE: &str = "spatial_weights.json";

/// Subdirectory paths relative to the data directory
pub const LOGS_DIR: &str = "logs";

/// Helper struct to manage data paths
#[derive(Clone, Debug)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Create a new DataPaths instance with the given root directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root data directory
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Get the GeoJSON boundaries file path
    pub fn geo_boundaries(&self) -> PathBuf {
        self.root.join(GEO_BOUNDARIES_FILE)
    }

    /// Get the trade flows CSV file path
    pub fn trade_flows(&self) -> PathBuf {
        self.root.join(TRADE_FLOWS_FILE)
    }

    /// Get the commodity time series file path
    pub fn time_series(&self) -> PathBuf {
        self.root.join(TIME_SERIES_FILE)
    }

    /// Get the precomputed spatial weights file path
    pub fn spatial_weights(&self) -> PathBuf {
        self.root.join(SPATIAL_WEIGHTS_FILE)
    }

    /// Get the logs directory
    pub fn logs(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    /// Ensure the root and logs directories exist
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.logs())?;
        Ok(())
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}
