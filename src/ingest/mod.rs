//! Concurrent loading of the four base dataset sources
//!
//! Each source (GeoJSON boundaries, trade flow CSV, commodity time series,
//! precomputed spatial weights) has its own loader submitted through the
//! shared [`TaskQueue`], so the four loads run concurrently under one
//! file-system concurrency cap. A missing file degrades to a typed empty
//! fallback with a warning; a file that exists but fails to parse aborts
//! the whole load. Invalid individual records are dropped and counted, not
//! fatal.

mod flows;
mod geo;
mod series;
mod weights_file;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::data_paths::DataPaths;
use crate::errors::{IngestError, SourceKind};
use crate::queue::{TaskHandle, TaskQueue};
use crate::regions::RegionNormalizer;
use crate::types::{FlowRecord, GeoDataset, SpatialWeights, TimeSeriesSet};

/// Per-source load statistics.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SourceSummary {
    /// Records kept after validation.
    pub records: usize,
    /// Records dropped by row validation or duplicate-key collapse.
    pub dropped: usize,
    /// True if the source file was missing and the empty fallback was used.
    pub fallback: bool,
    pub duration: Duration,
}

/// Load statistics across all four sources.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IngestSummary {
    pub geo: SourceSummary,
    pub flows: SourceSummary,
    pub series: SourceSummary,
    pub weights: SourceSummary,
    pub total_duration: Duration,
}

/// The fully normalized base dataset every downstream stage reads from.
#[derive(Debug, Clone, Default)]
pub struct BaseDataset {
    pub geo: GeoDataset,
    pub flows: Vec<FlowRecord>,
    pub series: TimeSeriesSet,
    pub weights: SpatialWeights,
    pub summary: IngestSummary,
}

/// One loaded source with its statistics, before assembly into
/// [`BaseDataset`].
struct SourceLoad<T> {
    data: T,
    summary: SourceSummary,
}

/// Loads and normalizes the base dataset sources through a bounded queue.
pub struct IngestPipeline {
    queue: Arc<TaskQueue>,
    normalizer: Arc<RegionNormalizer>,
}

impl IngestPipeline {
    pub fn new(queue: Arc<TaskQueue>, normalizer: RegionNormalizer) -> Self {
        Self {
            queue,
            normalizer: Arc::new(normalizer),
        }
    }

    /// Load all four sources concurrently and await the join barrier.
    ///
    /// Returns the populated dataset, or the first error in source order
    /// (geo, flows, series, weights). All four loads run to completion
    /// either way; a malformed source never leaves a half-written dataset
    /// behind because assembly only happens after every load succeeded.
    pub async fn load_all(&self, paths: &DataPaths) -> Result<BaseDataset, IngestError> {
        let start = Instant::now();
        info!("🚀 Loading base datasets from {}", paths.root().display());

        let geo_handle = self.submit_geo(paths.geo_boundaries());
        let flows_handle = self.submit_flows(paths.trade_flows());
        let series_handle = self.submit_series(paths.time_series());
        let weights_handle = self.submit_weights(paths.spatial_weights());

        let (geo, flows, series, weights) =
            tokio::join!(geo_handle, flows_handle, series_handle, weights_handle);
        let geo = geo??;
        let flows = flows??;
        let series = series??;
        let weights = weights??;

        let summary = IngestSummary {
            geo: geo.summary,
            flows: flows.summary,
            series: series.summary,
            weights: weights.summary,
            total_duration: start.elapsed(),
        };

        info!(
            "📊 Base datasets loaded in {:?}: {} features, {} flows, {} series groups, {} weight rows",
            summary.total_duration,
            geo.data.len(),
            flows.data.len(),
            series.data.len(),
            weights.data.len(),
        );

        Ok(BaseDataset {
            geo: geo.data,
            flows: flows.data,
            series: series.data,
            weights: weights.data,
            summary,
        })
    }

    /// Load just the geographic boundaries source.
    pub async fn load_geo_data(
        &self,
        path: impl Into<PathBuf>,
    ) -> Result<GeoDataset, IngestError> {
        Ok(self.submit_geo(path.into()).await??.data)
    }

    /// Load just the trade flows source.
    pub async fn load_flow_data(
        &self,
        path: impl Into<PathBuf>,
    ) -> Result<Vec<FlowRecord>, IngestError> {
        Ok(self.submit_flows(path.into()).await??.data)
    }

    /// Load just the commodity time series source.
    pub async fn load_time_series_data(
        &self,
        path: impl Into<PathBuf>,
    ) -> Result<TimeSeriesSet, IngestError> {
        Ok(self.submit_series(path.into()).await??.data)
    }

    /// Load just the precomputed spatial weights source.
    pub async fn load_weights_data(
        &self,
        path: impl Into<PathBuf>,
    ) -> Result<SpatialWeights, IngestError> {
        Ok(self.submit_weights(path.into()).await??.data)
    }

    fn submit_geo(
        &self,
        path: PathBuf,
    ) -> TaskHandle<Result<SourceLoad<GeoDataset>, IngestError>> {
        let normalizer = Arc::clone(&self.normalizer);
        self.queue.submit(async move {
            load_source(SourceKind::Geo, &path, GeoDataset::default(), |raw| {
                geo::parse(raw, &normalizer)
            })
        })
    }

    fn submit_flows(
        &self,
        path: PathBuf,
    ) -> TaskHandle<Result<SourceLoad<Vec<FlowRecord>>, IngestError>> {
        let normalizer = Arc::clone(&self.normalizer);
        self.queue.submit(async move {
            load_source(SourceKind::Flows, &path, Vec::new(), |raw| {
                flows::parse(raw, &normalizer)
            })
        })
    }

    fn submit_series(
        &self,
        path: PathBuf,
    ) -> TaskHandle<Result<SourceLoad<TimeSeriesSet>, IngestError>> {
        let normalizer = Arc::clone(&self.normalizer);
        self.queue.submit(async move {
            load_source(SourceKind::TimeSeries, &path, TimeSeriesSet::new(), |raw| {
                series::parse(raw, &normalizer)
            })
        })
    }

    fn submit_weights(
        &self,
        path: PathBuf,
    ) -> TaskHandle<Result<SourceLoad<SpatialWeights>, IngestError>> {
        let normalizer = Arc::clone(&self.normalizer);
        self.queue.submit(async move {
            load_source(SourceKind::Weights, &path, SpatialWeights::new(), |raw| {
                weights_file::parse(raw, &normalizer)
            })
        })
    }
}

/// Read one source file and run its parser, applying the fallback shim.
///
/// A missing file returns the typed empty fallback and a warning; any other
/// I/O failure or a parse failure is an error. The parser returns the data
/// plus kept/dropped record counts.
fn load_source<T, F>(
    kind: SourceKind,
    path: &Path,
    fallback: T,
    parse: F,
) -> Result<SourceLoad<T>, IngestError>
where
    F: FnOnce(&str) -> anyhow::Result<(T, usize, usize)>,
{
    let start = Instant::now();

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(
                "{} source missing at {}, using empty fallback",
                kind,
                path.display()
            );
            return Ok(SourceLoad {
                data: fallback,
                summary: SourceSummary {
                    fallback: true,
                    duration: start.elapsed(),
                    ..Default::default()
                },
            });
        }
        // Not UTF-8 is a content problem, not an access problem.
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            return Err(IngestError::malformed(kind, path, anyhow::Error::new(err)));
        }
        Err(err) => return Err(IngestError::Io(err)),
    };

    let (data, records, dropped) =
        parse(&raw).map_err(|err| IngestError::malformed(kind, path, err))?;

    if dropped > 0 {
        warn!(
            "{} source loaded with {} invalid records dropped ({} kept)",
            kind, dropped, records
        );
    } else {
        debug!("{} source loaded: {} records", kind, records);
    }
    Ok(SourceLoad {
        data,
        summary: SourceSummary {
            records,
            dropped,
            fallback: false,
            duration: start.elapsed(),
        },
    })
}

/// Pull a name-like property out of a JSON value, coercing numbers.
fn string_property(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric property that may arrive as a JSON number or a numeric string.
/// Non-finite values count as absent.
fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Parse a date field, accepting plain dates (dash or slash separated) and
/// RFC 3339 timestamps.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}
