//! Core data model shared by ingestion, spatial weights, and clustering
//!
//! Everything in this module is a plain value type: ingestion produces them
//! once per run, downstream stages only read them. Derived structures
//! (weights entries, clusters) are rebuilt from scratch rather than mutated.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical identifier for a market/region.
///
/// Values come out of [`crate::regions::RegionNormalizer`] (or are
/// deserialized from already-canonical data). Two raw spellings of the same
/// administrative region always map to the same `RegionId`, so this type can
/// be used as a map key across all derived structures.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    /// Wrap an identifier that is already in canonical form.
    ///
    /// Raw names from input files must go through
    /// [`crate::regions::RegionNormalizer::normalize`] instead; this
    /// constructor does no cleanup of its own.
    pub fn new(id: impl Into<String>) -> Self {
        RegionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RegionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A WGS84 coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A normalized geographic feature: one region with its centroid.
///
/// The raw GeoJSON-like geometry is carried along untouched so the
/// out-of-scope presentation layer can render boundaries without another
/// pass over the source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoFeature {
    /// Canonical region this feature describes.
    pub region_id: RegionId,
    /// Representative point used for all distance computations.
    pub centroid: LatLng,
    /// Original geometry payload, preserved verbatim.
    pub geometry: serde_json::Value,
}

/// The geographic subset of the base dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoDataset {
    pub features: Vec<GeoFeature>,
}

impl GeoDataset {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Look up a feature by its canonical region id.
    pub fn feature(&self, region: &RegionId) -> Option<&GeoFeature> {
        self.features.iter().find(|f| &f.region_id == region)
    }
}

/// One observed trade/price-transmission link between two markets on a date.
///
/// Records with a missing source, target, or date never make it out of
/// ingestion; numeric fields are lenient-parsed with defined defaults
/// instead (see the flow loader).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub source: RegionId,
    pub target: RegionId,
    pub date: NaiveDate,
    /// Trade volume proxy; never negative.
    pub flow_weight: f64,
    pub price_differential: f64,
    /// Price at the source market, if the column parsed.
    pub source_price: Option<f64>,
    /// Price at the target market, if the column parsed.
    pub target_price: Option<f64>,
    pub commodity: String,
}

impl FlowRecord {
    /// True if `region` is either endpoint of this flow.
    pub fn touches(&self, region: &RegionId) -> bool {
        &self.source == region || &self.target == region
    }
}

/// A single observation in a per-(region, commodity) price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub region_id: RegionId,
    pub commodity: String,
    pub date: NaiveDate,
    pub price: f64,
    pub usd_price: f64,
    pub conflict_intensity: f64,
    pub residual: f64,
}

/// Time-series observations grouped by (region, commodity), each group
/// sorted ascending by date.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesSet {
    groups: BTreeMap<(RegionId, String), Vec<TimeSeriesPoint>>,
}

impl TimeSeriesSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a point into its group. Sorting happens once via
    /// [`TimeSeriesSet::sort_groups`] after the loader has drained its input.
    pub(crate) fn insert(&mut self, point: TimeSeriesPoint) {
        self.groups
            .entry((point.region_id.clone(), point.commodity.clone()))
            .or_default()
            .push(point);
    }

    /// Sort every group ascending by date. Stable, so same-date points keep
    /// their file order.
    pub(crate) fn sort_groups(&mut self) {
        for points in self.groups.values_mut() {
            points.sort_by_key(|p| p.date);
        }
    }

    /// Number of groups, i.e. distinct (region, commodity) pairs.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of observations across all groups.
    pub fn point_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// The sorted series for one (region, commodity) pair, if present.
    pub fn series(&self, region: &RegionId, commodity: &str) -> Option<&[TimeSeriesPoint]> {
        self.groups
            .get(&(region.clone(), commodity.to_string()))
            .map(Vec::as_slice)
    }

    /// Distinct regions with at least one observation, in sorted order.
    pub fn regions(&self) -> Vec<&RegionId> {
        let mut out: Vec<&RegionId> = self.groups.keys().map(|(r, _)| r).collect();
        out.dedup();
        out
    }

    /// Distinct commodities with at least one observation, in sorted order.
    pub fn commodities(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.groups.keys().map(|(_, c)| c.as_str()).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Earliest and latest observation dates across the whole set.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut range: Option<(NaiveDate, NaiveDate)> = None;
        for points in self.groups.values() {
            // Groups are sorted, so first/last bound the group.
            if let (Some(first), Some(last)) = (points.first(), points.last()) {
                range = Some(match range {
                    None => (first.date, last.date),
                    Some((lo, hi)) => (lo.min(first.date), hi.max(last.date)),
                });
            }
        }
        range
    }

    /// Iterate groups in key order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&(RegionId, String), &Vec<TimeSeriesPoint>)> {
        self.groups.iter()
    }
}

/// One row of the spatial weights graph: a region, its neighbors, and the
/// row-normalized inverse-distance weights.
///
/// `neighbors` and `weights` are parallel arrays. When `neighbors` is
/// non-empty the weights sum to 1.0; an isolated region keeps both lists
/// empty, which is a valid state rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialWeightEntry {
    pub region_id: RegionId,
    pub neighbors: Vec<RegionId>,
    pub weights: Vec<f64>,
}

impl SpatialWeightEntry {
    /// An entry with no neighbors yet.
    pub fn empty(region_id: RegionId) -> Self {
        Self {
            region_id,
            neighbors: Vec::new(),
            weights: Vec::new(),
        }
    }

    pub fn is_isolated(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Neighbor ids zipped with their weights.
    pub fn neighbor_weights(&self) -> impl Iterator<Item = (&RegionId, f64)> {
        self.neighbors.iter().zip(self.weights.iter().copied())
    }
}

/// The full weights graph keyed by region.
///
/// A `BTreeMap` rather than a hash map: component discovery and tie-breaks
/// downstream depend on a defined iteration order, and sorted keys make
/// every run reproducible.
pub type SpatialWeights = BTreeMap<RegionId, SpatialWeightEntry>;

/// Mean and spread of the normalized price gap across a cluster's flows.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceIntegration {
    pub mean: f64,
    pub std: f64,
}

/// Derived measurements for one market cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterMetrics {
    /// Number of member markets.
    pub size: usize,
    /// Sum of flow weights over all retained flows.
    pub total_flow: f64,
    /// `total_flow / size`.
    pub avg_flow: f64,
    /// Retained flows relative to the directed pair count `size * (size-1)`.
    pub density: f64,
    /// Share of retained flows with both endpoints inside the cluster.
    pub internal_flow_ratio: f64,
    /// Retained flows with exactly one endpoint inside the cluster.
    pub external_connections: usize,
    /// Per-market combined in/out flow volume.
    pub market_importance: BTreeMap<RegionId, f64>,
    pub price_integration: PriceIntegration,
    /// Cluster size relative to the number of regions in the weights graph.
    pub relative_size: f64,
}

/// A connected group of markets refined by trade-flow volume.
///
/// Clusters are immutable value objects: refinement and ranking produce new
/// values, membership never changes after construction, and `main_market`
/// is always one of `markets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketCluster {
    /// Member markets in discovery order (duplicate-free).
    pub markets: Vec<RegionId>,
    /// The member with the highest combined in/out flow volume.
    pub main_market: RegionId,
    /// Every flow touching the cluster, boundary-crossing flows included.
    pub flows: Vec<FlowRecord>,
    pub metrics: ClusterMetrics,
}

impl MarketCluster {
    pub fn size(&self) -> usize {
        self.markets.len()
    }

    pub fn contains(&self, region: &RegionId) -> bool {
        self.markets.iter().any(|m| m == region)
    }
}
